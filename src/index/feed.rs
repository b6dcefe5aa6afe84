//! 外部のファイル監視から届く変更イベント

use std::future::Future;
use std::path::PathBuf;

use tokio::sync::mpsc;

/// ファイル変更イベント
///
/// リネームは削除と追加の組ではなく1つのイベントとして届く
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

/// ファイル変更イベントの供給元（監視そのものは埋め込み側が実装する）
pub trait FileChangeFeed: Send {
    /// 次のイベント。供給が終わったら None
    fn next(&mut self) -> impl Future<Output = Option<FileEvent>> + Send;
}

/// チャネル経由でイベントを受け取るフィード
pub struct ChannelFeed {
    receiver: mpsc::UnboundedReceiver<FileEvent>,
}

impl ChannelFeed {
    /// 送信側とフィードの組を作る
    pub fn channel() -> (mpsc::UnboundedSender<FileEvent>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }
}

impl FileChangeFeed for ChannelFeed {
    async fn next(&mut self) -> Option<FileEvent> {
        self.receiver.recv().await
    }
}
