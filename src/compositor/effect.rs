use crate::error::ExtractError;
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// Background treatment applied behind the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Effect {
    /// Keep the original background
    None,
    /// Darken the background by three stops
    Highlight,
    /// Soft white halo around the subject on a transparent background
    BokehHalo,
    /// Black and white background
    Noir,
    /// Transparent background
    #[default]
    Cut,
}

impl Effect {
    pub const ALL: [Effect; 5] = [
        Effect::None,
        Effect::Highlight,
        Effect::BokehHalo,
        Effect::Noir,
        Effect::Cut,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::Highlight => "Highlight",
            Effect::BokehHalo => "Bokeh Halo",
            Effect::Noir => "Noir",
            Effect::Cut => "Cut",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Effect {
    type Err = ExtractError;

    /// Accepts display names ("Bokeh Halo") and their kebab-case form ("bokeh-halo")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Effect::ALL
            .into_iter()
            .find(|e| e.display_name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ExtractError::Config(format!("unknown effect \"{}\"", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_cut() {
        assert_eq!(Effect::default(), Effect::Cut);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Bokeh Halo".parse::<Effect>().unwrap(), Effect::BokehHalo);
        assert_eq!("bokeh-halo".parse::<Effect>().unwrap(), Effect::BokehHalo);
        assert_eq!("NOIR".parse::<Effect>().unwrap(), Effect::Noir);
        assert!("sepia".parse::<Effect>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for effect in Effect::ALL {
            assert_eq!(effect.to_string().parse::<Effect>().unwrap(), effect);
        }
    }
}
