//! Pure byte-level codec helpers.
//!
//! All controller payloads are single bytes; these helpers translate
//! the human-facing units (percentages, speed, color temperature) into
//! the firmware's byte ranges and back, and compute the additive
//! checksum used by the standard dialect.

/// Highest effect delay byte accepted by the firmware (lowest speed).
const MAX_DELAY: u8 = 0x1f;

/// Converts a percentage (0-100, clamped) to a 0-255 byte.
pub fn percent_to_byte(percent: u8) -> u8 {
    (u16::from(percent.min(100)) * 255 / 100) as u8
}

/// Converts a 0-255 byte to a percentage (0-100).
pub fn byte_to_percent(byte: u8) -> u8 {
    (u16::from(byte) * 100 / 255) as u8
}

/// Converts an effect speed (0-100, clamped) to the firmware delay byte.
///
/// Delay runs inverted: 1 is the fastest, 31 the slowest.
pub fn speed_to_delay(speed: u8) -> u8 {
    let inv = u16::from(100 - speed.min(100));
    (inv * u16::from(MAX_DELAY - 1) / 100) as u8 + 1
}

/// Converts a firmware delay byte back to an effect speed (0-100).
pub fn delay_to_speed(delay: u8) -> u8 {
    let delay = delay.saturating_sub(1).min(MAX_DELAY - 1);
    let inv = u16::from(delay) * 100 / u16::from(MAX_DELAY - 1);
    100 - inv as u8
}

/// Computes the trailing checksum: sum of all bytes mod 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Appends the checksum of `msg` to it and returns the result.
pub fn with_checksum(mut msg: Vec<u8>) -> Vec<u8> {
    let csum = checksum(&msg);
    msg.push(csum);
    msg
}

/// Rescales an RGB triple to a target brightness via HSV.
///
/// The triple supplies hue and saturation; `value` replaces the value
/// magnitude, so callers can dim a color without re-specifying it.
pub fn scale_brightness(rgb: (u8, u8, u8), value: u8) -> (u8, u8, u8) {
    let (h, s, _) = rgb_to_hsv(rgb);
    hsv_to_rgb(h, s, f32::from(value))
}

/// Returns the HSV value magnitude (0-255) of an RGB triple.
pub fn brightness_of(rgb: (u8, u8, u8)) -> u8 {
    let (_, _, v) = rgb_to_hsv(rgb);
    v.round() as u8
}

/// RGB (0-255 per channel) to HSV with hue/saturation in 0-1 and value in 0-255.
pub fn rgb_to_hsv(rgb: (u8, u8, u8)) -> (f32, f32, f32) {
    let r = f32::from(rgb.0);
    let g = f32::from(rgb.1);
    let b = f32::from(rgb.2);
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let v = maxc;
    if (maxc - minc).abs() < f32::EPSILON {
        return (0.0, 0.0, v);
    }
    let s = (maxc - minc) / maxc;
    let rc = (maxc - r) / (maxc - minc);
    let gc = (maxc - g) / (maxc - minc);
    let bc = (maxc - b) / (maxc - minc);
    let h = if (r - maxc).abs() < f32::EPSILON {
        bc - gc
    } else if (g - maxc).abs() < f32::EPSILON {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

/// HSV (hue/saturation 0-1, value 0-255) back to an RGB triple.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let clamp = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    if s <= 0.0 {
        let v = clamp(v);
        return (v, v, v);
    }
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match (i as i32).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    (clamp(r), clamp(g), clamp(b))
}

/// Splits a color temperature into warm/cold white channel levels.
///
/// Output temperature is assumed to span 2700-6500 K; the warm and
/// cold LEDs are scaled linearly across that range and then by the
/// requested brightness.
pub fn white_temperature(kelvin: u16, brightness: u8) -> (u8, u8) {
    let t = f32::from(kelvin.clamp(2700, 6500) - 2700);
    let warm = 255.0 * (1.0 - t / 3800.0);
    let cold = (255.0 * t / 3800.0).min(255.0);
    let scale = f32::from(brightness) / 255.0;
    ((warm * scale).round() as u8, (cold * scale).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_byte_endpoints() {
        assert_eq!(percent_to_byte(0), 0);
        assert_eq!(percent_to_byte(100), 255);
        assert_eq!(percent_to_byte(50), 127);
        // Out-of-range input clamps rather than wrapping
        assert_eq!(percent_to_byte(200), 255);

        assert_eq!(byte_to_percent(0), 0);
        assert_eq!(byte_to_percent(255), 100);
    }

    #[test]
    fn test_speed_delay_endpoints() {
        // Full speed is the smallest delay
        assert_eq!(speed_to_delay(100), 1);
        assert_eq!(speed_to_delay(0), 31);
        assert_eq!(delay_to_speed(1), 100);
        assert_eq!(delay_to_speed(31), 0);
        // Delay bytes outside the firmware range clamp
        assert_eq!(delay_to_speed(0), 100);
        assert_eq!(delay_to_speed(0xf0), 0);
    }

    #[test]
    fn test_speed_delay_roundtrip() {
        for speed in (0..=100).step_by(10) {
            let delay = speed_to_delay(speed);
            assert!((1..=31).contains(&delay));
            let back = delay_to_speed(delay);
            assert!(back.abs_diff(speed) <= 3, "{speed} -> {delay} -> {back}");
        }
    }

    #[test]
    fn test_checksum_mod_256() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0xff, 0x01]), 0x00);
        // 14-byte state frame observed from a 5-channel controller
        let frame = [
            0x81, 0x25, 0x23, 0x61, 0x21, 0x06, 0x38, 0x05, 0x06, 0xf9, 0x01, 0x00, 0x0f,
        ];
        assert_eq!(checksum(&frame), 0x9d);
    }

    #[test]
    fn test_with_checksum_appends() {
        let msg = with_checksum(vec![0x71, 0x23, 0x0f]);
        assert_eq!(msg, vec![0x71, 0x23, 0x0f, 0xa3]);
    }

    #[test]
    fn test_scale_brightness_preserves_hue() {
        // Dim pure red: hue survives, value drops
        assert_eq!(scale_brightness((255, 0, 0), 128), (128, 0, 0));
        // Grey input stays grey
        assert_eq!(scale_brightness((80, 80, 80), 40), (40, 40, 40));
    }

    #[test]
    fn test_brightness_of() {
        assert_eq!(brightness_of((255, 0, 0)), 255);
        assert_eq!(brightness_of((10, 20, 30)), 30);
    }

    #[test]
    fn test_hsv_roundtrip() {
        for rgb in [(255, 0, 0), (0, 255, 0), (0, 0, 255), (0x38, 0x05, 0x06)] {
            let (h, s, v) = rgb_to_hsv(rgb);
            assert_eq!(hsv_to_rgb(h, s, v), rgb);
        }
    }

    #[test]
    fn test_white_temperature_extremes() {
        assert_eq!(white_temperature(2700, 255), (255, 0));
        assert_eq!(white_temperature(6500, 255), (0, 255));
        let (warm, cold) = white_temperature(4600, 255);
        assert!(warm > 100 && cold > 100);
        // Brightness scales both channels
        assert_eq!(white_temperature(2700, 0), (0, 0));
    }
}
