// Worker → foreground event plumbing
//
// Workers only send; a single consumer drains the channel and hands each
// event to a Presenter, so presentation state is never touched off that task.

use tokio::sync::mpsc;

use super::models::{AppEvent, ProgressEvent, VideoSummary};

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Whatever shows results to the user
pub trait Presenter {
    fn on_info_ready(&mut self, info: Result<&VideoSummary, &str>);
    fn on_progress(&mut self, progress: &ProgressEvent);
    fn on_complete(&mut self, success: bool, message: &str);
}

pub fn dispatch<P: Presenter + ?Sized>(presenter: &mut P, event: &AppEvent) {
    match event {
        AppEvent::InfoReady(info) => {
            presenter.on_info_ready(info.as_ref().map_err(String::as_str))
        }
        AppEvent::Progress(progress) => presenter.on_progress(progress),
        AppEvent::Complete { success, message } => presenter.on_complete(*success, message),
    }
}

/// Drain events until every sender is dropped
pub async fn run_event_loop<P: Presenter + ?Sized>(mut rx: EventReceiver, presenter: &mut P) {
    while let Some(event) = rx.recv().await {
        dispatch(presenter, &event);
    }
}
