//! Named colors.
//!
//! [`basic`] holds the primaries; [`tango`] the Tango desktop palette in
//! light, medium and dark shades (six steps for aluminium). All entries are
//! opaque.

use super::Color;

const fn tone(r: f32, g: f32, b: f32) -> Color {
    Color::opaque(r / 256.0, g / 256.0, b / 256.0)
}

pub mod basic {
    use crate::paint::Color;

    pub const WHITE: Color = Color::opaque(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::opaque(0.0, 0.0, 0.0);
    pub const YELLOW: Color = Color::opaque(1.0, 1.0, 0.0);
    pub const ORANGE: Color = Color::opaque(1.0, 0.5, 0.0);
    pub const BLUE: Color = Color::opaque(0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::opaque(0.0, 1.0, 0.0);
    pub const RED: Color = Color::opaque(1.0, 0.0, 0.0);
    pub const MAGENTA: Color = Color::opaque(1.0, 0.0, 1.0);
    pub const CYAN: Color = Color::opaque(0.0, 1.0, 1.0);

    pub const ALL: [Color; 9] = [WHITE, BLACK, YELLOW, ORANGE, BLUE, GREEN, RED, MAGENTA, CYAN];
}

pub mod tango {
    use super::tone;
    use crate::paint::Color;

    pub const BUTTER_LIGHT: Color = tone(252.0, 233.0, 79.0);
    pub const BUTTER_MED: Color = tone(237.0, 212.0, 0.0);
    pub const BUTTER_DARK: Color = tone(196.0, 160.0, 0.0);
    pub const ORANGE_LIGHT: Color = tone(252.0, 175.0, 62.0);
    pub const ORANGE_MED: Color = tone(245.0, 121.0, 0.0);
    pub const ORANGE_DARK: Color = tone(206.0, 92.0, 0.0);
    pub const CHOCOLATE_LIGHT: Color = tone(233.0, 185.0, 110.0);
    pub const CHOCOLATE_MED: Color = tone(193.0, 125.0, 17.0);
    pub const CHOCOLATE_DARK: Color = tone(143.0, 89.0, 2.0);
    pub const CHAMELEON_LIGHT: Color = tone(138.0, 226.0, 52.0);
    pub const CHAMELEON_MED: Color = tone(115.0, 209.0, 38.0);
    pub const CHAMELEON_DARK: Color = tone(78.0, 154.0, 6.0);
    pub const SKYBLUE_LIGHT: Color = tone(114.0, 159.0, 207.0);
    pub const SKYBLUE_MED: Color = tone(52.0, 101.0, 164.0);
    pub const SKYBLUE_DARK: Color = tone(32.0, 74.0, 135.0);
    pub const PLUM_LIGHT: Color = tone(173.0, 127.0, 168.0);
    pub const PLUM_MED: Color = tone(117.0, 80.0, 123.0);
    pub const PLUM_DARK: Color = tone(92.0, 53.0, 102.0);
    pub const SCARLETRED_LIGHT: Color = tone(239.0, 41.0, 41.0);
    pub const SCARLETRED_MED: Color = tone(204.0, 0.0, 0.0);
    pub const SCARLETRED_DARK: Color = tone(164.0, 0.0, 0.0);
    pub const ALUMINIUM1: Color = tone(238.0, 238.5, 236.0);
    pub const ALUMINIUM2: Color = tone(211.0, 215.0, 207.0);
    pub const ALUMINIUM3: Color = tone(186.0, 189.0, 182.0);
    pub const ALUMINIUM4: Color = tone(136.0, 138.0, 133.0);
    pub const ALUMINIUM5: Color = tone(85.0, 87.0, 83.0);
    pub const ALUMINIUM6: Color = tone(46.0, 52.0, 54.0);

    pub const ALL: [Color; 27] = [
        BUTTER_LIGHT, BUTTER_MED, BUTTER_DARK,
        ORANGE_LIGHT, ORANGE_MED, ORANGE_DARK,
        CHOCOLATE_LIGHT, CHOCOLATE_MED, CHOCOLATE_DARK,
        CHAMELEON_LIGHT, CHAMELEON_MED, CHAMELEON_DARK,
        SKYBLUE_LIGHT, SKYBLUE_MED, SKYBLUE_DARK,
        PLUM_LIGHT, PLUM_MED, PLUM_DARK,
        SCARLETRED_LIGHT, SCARLETRED_MED, SCARLETRED_DARK,
        ALUMINIUM1, ALUMINIUM2, ALUMINIUM3, ALUMINIUM4, ALUMINIUM5, ALUMINIUM6,
    ];
}

/// Looks a palette entry up by its lowercase name, e.g. `"red"` or
/// `"skyblue_dark"`. Used by the demo's command line.
pub fn by_name(name: &str) -> Option<Color> {
    use self::{basic::*, tango::*};
    let c = match name {
        "white" => WHITE,
        "black" => BLACK,
        "yellow" => YELLOW,
        "orange" => ORANGE,
        "blue" => BLUE,
        "green" => GREEN,
        "red" => RED,
        "magenta" => MAGENTA,
        "cyan" => CYAN,
        "butter_light" => BUTTER_LIGHT,
        "butter_med" => BUTTER_MED,
        "butter_dark" => BUTTER_DARK,
        "orange_light" => ORANGE_LIGHT,
        "orange_med" => ORANGE_MED,
        "orange_dark" => ORANGE_DARK,
        "chocolate_light" => CHOCOLATE_LIGHT,
        "chocolate_med" => CHOCOLATE_MED,
        "chocolate_dark" => CHOCOLATE_DARK,
        "chameleon_light" => CHAMELEON_LIGHT,
        "chameleon_med" => CHAMELEON_MED,
        "chameleon_dark" => CHAMELEON_DARK,
        "skyblue_light" => SKYBLUE_LIGHT,
        "skyblue_med" => SKYBLUE_MED,
        "skyblue_dark" => SKYBLUE_DARK,
        "plum_light" => PLUM_LIGHT,
        "plum_med" => PLUM_MED,
        "plum_dark" => PLUM_DARK,
        "scarletred_light" => SCARLETRED_LIGHT,
        "scarletred_med" => SCARLETRED_MED,
        "scarletred_dark" => SCARLETRED_DARK,
        "aluminium1" => ALUMINIUM1,
        "aluminium2" => ALUMINIUM2,
        "aluminium3" => ALUMINIUM3,
        "aluminium4" => ALUMINIUM4,
        "aluminium5" => ALUMINIUM5,
        "aluminium6" => ALUMINIUM6,
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_are_opaque_and_in_range() {
        for c in basic::ALL.iter().chain(tango::ALL.iter()) {
            assert!(c.is_opaque());
            assert!([c.r, c.g, c.b].iter().all(|v| (0.0..1.0 + f32::EPSILON).contains(v)));
        }
    }

    #[test]
    fn tango_uses_256_denominator() {
        assert_eq!(tango::SCARLETRED_MED.r, 204.0 / 256.0);
        assert_eq!(tango::SCARLETRED_MED.g, 0.0);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("orange"), Some(basic::ORANGE));
        assert_eq!(by_name("plum_dark"), Some(tango::PLUM_DARK));
        assert_eq!(by_name("mauve"), None);
    }
}
