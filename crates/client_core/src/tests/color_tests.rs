use super::*;

#[test]
fn first_two_rounds_use_the_fixed_sequences() {
    assert_eq!(color_for_index(0).to_string(), "#8ae234");
    assert_eq!(color_for_index(4).to_string(), "#ad7fa8");
    assert_eq!(color_for_index(5).to_string(), "#73d216");
    assert_eq!(color_for_index(9).to_string(), "#75507b");
}

#[test]
fn later_rounds_bisect_between_sequences() {
    assert_eq!(shade_fraction(0), 0.5);
    assert_eq!(shade_fraction(1), 0.25);
    assert_eq!(shade_fraction(2), 0.75);
    assert_eq!(shade_fraction(3), 0.125);
    assert_eq!(shade_fraction(4), 0.375);

    // Halfway between 0x73D216 and 0x8AE234.
    assert_eq!(color_for_index(10), Rgb { r: 126, g: 218, b: 37 });
}

#[test]
fn blended_colours_stay_between_their_endpoints() {
    for index in 10..60 {
        let column = index % 5;
        let dark = Rgb::from_u32(SEQUENCE_2[column]);
        let light = Rgb::from_u32(SEQUENCE_1[column]);
        let color = color_for_index(index);
        for (value, a, b) in [
            (color.r, dark.r, light.r),
            (color.g, dark.g, light.g),
            (color.b, dark.b, light.b),
        ] {
            assert!(value >= a.min(b) && value <= a.max(b), "index {index}");
        }
    }
}

#[test]
fn picker_is_stable_per_key() {
    let mut picker = ColorPicker::default();
    let math = picker.pick("Math");
    let physics = picker.pick("Physics");

    assert_ne!(math, physics);
    assert_eq!(picker.pick("Math"), math);
    assert_eq!(picker.len(), 2);
}
