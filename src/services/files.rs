use std::path::{Path, PathBuf};

/// Application and public roots used to resolve upload paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    pub application: PathBuf,
    pub public: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self::new("application", "public")
    }
}

impl Directories {
    pub fn new(application: impl Into<PathBuf>, public: impl Into<PathBuf>) -> Self {
        Self {
            application: application.into(),
            public: public.into(),
        }
    }

    /// Replaces the `%application%` and `%public%` placeholders of a path.
    pub fn resolve(&self, path: &str) -> PathBuf {
        PathBuf::from(
            path.replace("%application%", &self.application.to_string_lossy())
                .replace("%public%", &self.public.to_string_lossy()),
        )
    }
}

/// Produces the URL of an image for display in a listing.
pub trait ImageUrlGenerator: Send + Sync {
    fn generate_url(&self, image: &str) -> String;
}

/// Serves images from the public directory under a URL prefix.
#[derive(Debug, Clone)]
pub struct PublicImageUrlGenerator {
    public_dir: PathBuf,
    base_url: String,
}

impl PublicImageUrlGenerator {
    pub fn new(public_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            public_dir: public_dir.into(),
            base_url: base_url.into(),
        }
    }
}

impl ImageUrlGenerator for PublicImageUrlGenerator {
    fn generate_url(&self, image: &str) -> String {
        if image.starts_with("http://") || image.starts_with("https://") || image.starts_with("//") {
            return image.to_string();
        }

        let relative = Path::new(image)
            .strip_prefix(&self.public_dir)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| image.to_string());

        let path = relative
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
