//! Server state and connection management.

use std::sync::Arc;

use crate::usecase::{
    ConnectViewerUseCase, DisconnectViewerUseCase, EndStreamUseCase, GetStreamsUseCase,
    SendChatUseCase, SetPoseUseCase, SpeakUseCase, StartStreamUseCase,
};

/// Shared application state
pub struct AppState {
    /// StartStreamUseCase（配信開始のユースケース）
    pub start_stream_usecase: Arc<StartStreamUseCase>,
    /// SpeakUseCase（発話のユースケース）
    pub speak_usecase: Arc<SpeakUseCase>,
    /// SetPoseUseCase（ポーズ更新のユースケース）
    pub set_pose_usecase: Arc<SetPoseUseCase>,
    /// EndStreamUseCase（配信終了のユースケース）
    pub end_stream_usecase: Arc<EndStreamUseCase>,
    /// ConnectViewerUseCase（視聴者接続のユースケース）
    pub connect_viewer_usecase: Arc<ConnectViewerUseCase>,
    /// DisconnectViewerUseCase（視聴者切断のユースケース）
    pub disconnect_viewer_usecase: Arc<DisconnectViewerUseCase>,
    /// SendChatUseCase（チャット送信のユースケース）
    pub send_chat_usecase: Arc<SendChatUseCase>,
    /// GetStreamsUseCase（配信一覧取得のユースケース）
    pub get_streams_usecase: Arc<GetStreamsUseCase>,
}
