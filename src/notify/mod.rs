pub mod cue;
pub mod push;

use crate::error::PushFailure;
use cue::LocalCue;
use log::debug;
use push::PushClient;

/// Sink for alert notifications.
pub trait Notify {
    async fn notify(&self, title: &str, body: &str) -> Result<(), PushFailure>;
}

/// Plays the local cue, then forwards to the push backend when one is configured.
pub struct Dispatcher {
    cue: Box<dyn LocalCue>,
    push: Option<PushClient>,
}

impl Dispatcher {
    pub fn new(cue: Box<dyn LocalCue>, push: Option<PushClient>) -> Self {
        Self { cue, push }
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_some()
    }
}

impl Notify for Dispatcher {
    async fn notify(&self, title: &str, body: &str) -> Result<(), PushFailure> {
        if let Err(e) = self.cue.play() {
            debug!("local cue failed: {}", e);
        }

        match &self.push {
            Some(push) => push.send(title, body).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::push::PushProvider;
    use std::cell::Cell;
    use std::io;
    use std::rc::Rc;

    struct CountingCue {
        plays: Rc<Cell<usize>>,
        fail: bool,
    }

    impl LocalCue for CountingCue {
        fn play(&self) -> io::Result<()> {
            self.plays.set(self.plays.get() + 1);
            if self.fail {
                Err(io::Error::new(io::ErrorKind::Other, "no audio device"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn cue_plays_without_push_backend() {
        let plays = Rc::new(Cell::new(0));
        let dispatcher = Dispatcher::new(
            Box::new(CountingCue {
                plays: plays.clone(),
                fail: false,
            }),
            None,
        );

        assert!(!dispatcher.push_enabled());
        assert!(dispatcher.notify("t", "b").await.is_ok());
        assert_eq!(plays.get(), 1);
    }

    #[tokio::test]
    async fn cue_failure_is_swallowed() {
        let plays = Rc::new(Cell::new(0));
        let dispatcher = Dispatcher::new(
            Box::new(CountingCue {
                plays: plays.clone(),
                fail: true,
            }),
            None,
        );

        assert!(dispatcher.notify("t", "b").await.is_ok());
        assert_eq!(plays.get(), 1);
    }

    #[tokio::test]
    async fn push_failure_is_returned_after_cue() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let plays = Rc::new(Cell::new(0));
        let push = PushClient::with_base(reqwest::Client::new(), PushProvider::Bark, "tok", &base);
        let dispatcher = Dispatcher::new(
            Box::new(CountingCue {
                plays: plays.clone(),
                fail: false,
            }),
            push,
        );

        let failure = dispatcher.notify("t", "b").await.unwrap_err();
        assert_eq!(failure.provider, "bark");
        assert_eq!(plays.get(), 1);
    }
}
