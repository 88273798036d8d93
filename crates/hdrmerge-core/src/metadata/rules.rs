use super::group_name;

/// Rules for the tag-coded namespace.
#[derive(Clone, Copy, Debug)]
pub struct ExifRules {
    /// Copied from the source even when the destination already has them.
    pub force_copy: &'static [&'static str],
    /// Never copied.
    pub exclude_keys: &'static [&'static str],
    /// Records whose group starts with one of these are never copied.
    pub exclude_group_prefixes: &'static [&'static str],
    /// Tag marking the merged sub-image as the primary image.
    pub primary_flag_key: &'static str,
    pub primary_flag_value: i64,
}

impl ExifRules {
    pub fn is_forced(&self, key: &str) -> bool {
        self.force_copy.contains(&key)
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        let group = group_name(key);
        self.exclude_keys.contains(&key)
            || self
                .exclude_group_prefixes
                .iter()
                .any(|prefix| group.starts_with(prefix))
    }
}

/// Complete rule table for metadata fusion.
#[derive(Clone, Copy, Debug)]
pub struct FusionRules {
    /// Hierarchical groups describing the container itself.
    pub xmp_excluded_groups: &'static [&'static str],
    pub exif: ExifRules,
}

impl FusionRules {
    pub fn is_xmp_excluded(&self, key: &str) -> bool {
        self.xmp_excluded_groups.contains(&group_name(key))
    }
}

pub const DEFAULT_RULES: FusionRules = FusionRules {
    xmp_excluded_groups: &["tiff"],
    exif: ExifRules {
        force_copy: &[
            // Make and model must describe the input camera for makernotes
            // to be interpreted.
            "Exif.Image.Make",
            "Exif.Image.Model",
            "Exif.Image.Artist",
            "Exif.Image.Copyright",
            "Exif.Image.DNGPrivateData",
            "Exif.SubImage1.OpcodeList1",
            "Exif.SubImage1.OpcodeList2",
            "Exif.SubImage1.OpcodeList3",
        ],
        exclude_keys: &[
            "Exif.OlympusCs.PreviewImageStart",
            "Exif.OlympusCs.PreviewImageLength",
            "Exif.Thumbnail.JPEGInterchangeFormat",
            "Exif.Thumbnail.JPEGInterchangeFormatLength",
            "Exif.NikonPreview.JPEGInterchangeFormat",
            "Exif.NikonPreview.JPEGInterchangeFormatLength",
            "Exif.Pentax.PreviewOffset",
            "Exif.Pentax.PreviewLength",
            "Exif.PentaxDng.PreviewOffset",
            "Exif.PentaxDng.PreviewLength",
            "Exif.Minolta.ThumbnailOffset",
            "Exif.Minolta.ThumbnailLength",
            "Exif.SonyMinolta.ThumbnailOffset",
            "Exif.SonyMinolta.ThumbnailLength",
            "Exif.Olympus.ThumbnailImage",
            "Exif.Olympus2.ThumbnailImage",
            "Exif.Minolta.Thumbnail",
            "Exif.PanasonicRaw.PreviewImage",
            "Exif.SamsungPreview.JPEGInterchangeFormat",
            "Exif.SamsungPreview.JPEGInterchangeFormatLength",
        ],
        exclude_group_prefixes: &["Thumb", "SubThumb", "Image", "SubImage"],
        primary_flag_key: "Exif.SubImage1.NewSubfileType",
        primary_flag_value: 0,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_prefixes_match_by_prefix() {
        let rules = DEFAULT_RULES.exif;
        assert!(rules.is_excluded("Exif.Thumbnail.Compression"));
        assert!(rules.is_excluded("Exif.SubThumb1.ImageWidth"));
        assert!(rules.is_excluded("Exif.Image2.ImageWidth"));
        assert!(rules.is_excluded("Exif.SubImage2.NewSubfileType"));
        assert!(!rules.is_excluded("Exif.Photo.ExposureTime"));
        assert!(!rules.is_excluded("Exif.Canon.ModelID"));
    }

    #[test]
    fn test_forced_keys_are_exact() {
        let rules = DEFAULT_RULES.exif;
        assert!(rules.is_forced("Exif.Image.Make"));
        assert!(!rules.is_forced("Exif.Image.Make2"));
    }

    #[test]
    fn test_xmp_excludes_container_group_only() {
        assert!(DEFAULT_RULES.is_xmp_excluded("Xmp.tiff.Make"));
        assert!(!DEFAULT_RULES.is_xmp_excluded("Xmp.tiffx.Make"));
        assert!(!DEFAULT_RULES.is_xmp_excluded("Xmp.dc.creator"));
    }
}
