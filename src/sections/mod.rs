//! Homepage sections: form validation plus admin and public operations.

pub mod featured;
pub mod footer;
pub mod hero;
pub mod navigation;
pub mod value_props;
