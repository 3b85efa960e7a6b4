pub mod block;
pub mod parser;
pub mod ring;
pub mod timestamp;
pub mod window;

pub use block::{RawBlock, BLOCK_SIZE};
pub use parser::{decode_block, DecodedBlock};
pub use window::{filter_regions, filter_window, Window};
