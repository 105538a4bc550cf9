pub mod bus;
pub mod channel;

pub use bus::{CoreLink, CoreSide, MessageBus, RecordingBus, ReplyCallback};
pub use channel::{
    Channel, CustomCssPayload, DocumentId, Envelope, ExportFormat, ExportPayload, InboundEvent,
    MessageId, NewEntryPayload, RenamePayload, Reply, TagRecord, TargetMode, TargetPayload,
};
