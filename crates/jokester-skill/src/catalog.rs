//! [`AssetCatalog`] – the robot's audio and image names, fetched once per run.

use std::collections::HashSet;

use jokester_types::AssetDetails;

/// Read-only snapshot of the assets stored on the robot.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    audio: HashSet<String>,
    images: HashSet<String>,
}

impl AssetCatalog {
    pub fn new(
        audio: impl IntoIterator<Item = AssetDetails>,
        images: impl IntoIterator<Item = AssetDetails>,
    ) -> Self {
        Self {
            audio: audio.into_iter().map(|a| a.name).collect(),
            images: images.into_iter().map(|i| i.name).collect(),
        }
    }

    pub fn has_audio(&self, name: &str) -> bool {
        self.audio.contains(name)
    }

    pub fn has_image(&self, name: &str) -> bool {
        self.images.contains(name)
    }

    pub fn audio_count(&self) -> usize {
        self.audio.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Return `wanted` if the robot has it, otherwise `fallback`.
    ///
    /// The fallback itself is not checked: it is a stock clip every robot
    /// ships with.
    pub fn resolve_clip<'a>(&self, wanted: &'a str, fallback: &'a str) -> &'a str {
        if self.has_audio(wanted) { wanted } else { fallback }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AssetCatalog {
        AssetCatalog::new(
            [AssetDetails::user("joke1.wav"), AssetDetails::user("ok.wav")],
            [AssetDetails::user("e_Joy.jpg")],
        )
    }

    #[test]
    fn resolve_keeps_known_clip() {
        assert_eq!(catalog().resolve_clip("joke1.wav", "s_Awe.wav"), "joke1.wav");
    }

    #[test]
    fn resolve_substitutes_missing_clip() {
        assert_eq!(catalog().resolve_clip("joke9.wav", "s_Awe.wav"), "s_Awe.wav");
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(!catalog().has_audio("JOKE1.wav"));
    }

    #[test]
    fn images_and_audio_are_separate() {
        let c = catalog();
        assert!(c.has_image("e_Joy.jpg"));
        assert!(!c.has_audio("e_Joy.jpg"));
        assert_eq!(c.audio_count(), 2);
        assert_eq!(c.image_count(), 1);
    }

    #[test]
    fn empty_catalog_always_falls_back() {
        let c = AssetCatalog::default();
        assert_eq!(c.resolve_clip("ok.wav", "s_Awe.wav"), "s_Awe.wav");
    }
}
