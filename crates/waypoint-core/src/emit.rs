//! The transport boundary responses are emitted through.

use crate::Response;

/// Writes a finished response to the client.
///
/// Emission is the last step of sending a response. Implementations return
/// `false` when the response could not be written.
pub trait Emitter: Send + Sync {
    /// Emits `response`.
    fn emit(&self, response: Response) -> bool;
}

impl<F> Emitter for F
where
    F: Fn(Response) -> bool + Send + Sync,
{
    fn emit(&self, response: Response) -> bool {
        self(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResponseExt;
    use std::sync::Mutex;

    #[test]
    fn test_closure_emitter() {
        let seen = Mutex::new(Vec::new());
        let emitter = |response: Response| {
            seen.lock().unwrap().push(response.status());
            true
        };
        assert!(emitter.emit(Response::empty()));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
