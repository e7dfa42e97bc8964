pub mod feed;
pub mod item;
pub mod snapshot;
pub mod watermark;

pub use feed::Feed;
pub use item::{compare_ids, Item, ResultSet};
pub use snapshot::ScrollSnapshot;
pub use watermark::WatermarkKind;
