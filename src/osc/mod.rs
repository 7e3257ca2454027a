// OSC ingestion and broadcast
//
// Live sources push bitmaps as OSC strings over UDP. Valid frames are fanned
// out to every worker connected to `/render`; the service thereby acts as
// the `osc` renderer.

pub mod handlers;
pub mod notifier;
pub mod registry;
pub mod server;
pub mod validate;

pub use handlers::{router, OscState};
pub use notifier::{HttpTakeoverNotifier, TakeoverNotifier};
pub use registry::{FrameQueue, SubscriberRegistry, Subscription};
pub use server::{BroadcastFormat, DatagramReport, IngestStats, OscIngest};
pub use validate::{frame_from_message, FrameRejection};
