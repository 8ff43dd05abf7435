pub mod stage_client;

pub use stage_client::RemoteStageClient;
