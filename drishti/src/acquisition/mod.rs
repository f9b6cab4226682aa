//! Raw sensor acquisition

pub mod frame_buffer;
pub mod range_array;
pub mod shm;

pub use frame_buffer::{
    FrameBufferAcquirer, InProcessSegment, SegmentGuard, SegmentRegistry, SharedMemory,
    SharedMemoryFactory,
};
pub use range_array::{ChannelReader, IioAdcReader, RangeArrayReader, StaticChannels};
pub use shm::{DEFAULT_SHM_DIR, MappedSegment, ShmDirectory};
