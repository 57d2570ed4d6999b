pub mod files;
pub mod i18n;
pub mod security;
pub mod translator;

pub use files::{Directories, ImageUrlGenerator, PublicImageUrlGenerator};
pub use i18n::I18n;
pub use security::{GrantedPermissions, PermissionChecker};
pub use translator::{MapTranslator, Translator};
