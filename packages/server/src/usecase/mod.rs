//! UseCase layer: application services orchestrating the domain, the
//! registry, the viewer pusher and the external collaborators.

pub mod connect_viewer;
pub mod disconnect_viewer;
pub mod end_stream;
pub mod error;
pub mod get_streams;
pub mod send_chat;
pub mod set_pose;
pub mod speak;
pub mod start_stream;
pub mod ticker;

pub use connect_viewer::ConnectViewerUseCase;
pub use disconnect_viewer::DisconnectViewerUseCase;
pub use end_stream::EndStreamUseCase;
pub use error::{
    ConnectViewerError, EndStreamError, SendChatError, SetPoseError, SpeakError, StartStreamError,
};
pub use get_streams::GetStreamsUseCase;
pub use send_chat::SendChatUseCase;
pub use set_pose::SetPoseUseCase;
pub use speak::SpeakUseCase;
pub use start_stream::StartStreamUseCase;
pub use ticker::StreamTicker;
