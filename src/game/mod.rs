pub mod note;
pub mod timing;
