use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    Still,
    Video,
    Webp,
}

impl VariantKind {
    pub fn is_animated(self) -> bool {
        !matches!(self, VariantKind::Still)
    }

    pub fn label(self) -> &'static str {
        match self {
            VariantKind::Still => "gif",
            VariantKind::Video => "mp4",
            VariantKind::Webp => "webp",
        }
    }
}

/// One concrete rendition of a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaVariant {
    pub locator: Url,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    pub kind: VariantKind,
}

impl MediaVariant {
    pub fn new(locator: Url, width: u32, height: u32, byte_size: u64, kind: VariantKind) -> Self {
        Self {
            locator,
            width,
            height,
            byte_size,
            kind,
        }
    }

    /// Height needed to show this variant at `width` without distorting it.
    pub fn height_for_width(&self, width: u32) -> u32 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let scaled = u64::from(self.height) * u64::from(width) / u64::from(self.width);
        u32::try_from(scaled).unwrap_or(u32::MAX)
    }

    /// A zero byte size means the provider did not report one.
    pub fn fits_within(&self, max_bytes: u64) -> bool {
        self.byte_size == 0 || self.byte_size <= max_bytes
    }
}

/// A named family of renditions sharing one resolution.
///
/// The provider publishes a still (gif) URL plus optional mp4 and webp
/// encodings for each family; each slot holds at most one variant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rendition {
    pub name: String,
    pub still: Option<MediaVariant>,
    pub video: Option<MediaVariant>,
    pub webp: Option<MediaVariant>,
}

impl Rendition {
    pub fn variants(&self) -> impl Iterator<Item = &MediaVariant> {
        self.still
            .iter()
            .chain(self.video.iter())
            .chain(self.webp.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.still.is_none() && self.video.is_none() && self.webp.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    id: String,
    title: String,
    renditions: Vec<Rendition>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, renditions: Vec<Rendition>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            renditions: renditions.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn renditions(&self) -> &[Rendition] {
        &self.renditions
    }

    pub fn variants(&self) -> impl Iterator<Item = &MediaVariant> {
        self.renditions.iter().flat_map(Rendition::variants)
    }

    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            &self.id
        } else {
            title
        }
    }
}

pub fn parse_count(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

pub fn parse_dimension(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}
