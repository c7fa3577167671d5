pub mod dispatcher;
pub mod image_probe;

pub use dispatcher::{
    CommandDispatcher, CommandHandle, CommandRequest, Dispatch, ImageOptions, InFlight,
};
pub use image_probe::ImageInfo;
