pub mod image_folder;
pub mod loader;

pub use image_folder::ImageFolder;
pub use loader::{Batch, DataLoader, DataSource};
