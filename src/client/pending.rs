use std::collections::HashMap;

use tokio::time::Instant;

use crate::client::message::Request;
use crate::common::frame::TxId;
use crate::error::RequestError;

/// A request that has been written to the socket and is awaiting its response
pub(crate) struct Pending {
    pub(crate) request: Request,
    /// serialized function code + body, kept so that a retransmission is
    /// byte-identical to the original
    pub(crate) pdu: Vec<u8>,
    pub(crate) deadline: Instant,
    pub(crate) retries_left: usize,
}

/// Outstanding requests keyed by transaction id, plus the allocator that
/// hands out ids. Responses are correlated by id, so multiple requests may
/// be in flight on the same connection at once.
pub(crate) struct PendingRequests {
    map: HashMap<u16, Pending>,
    next_tx: TxId,
}

impl PendingRequests {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
            next_tx: TxId::default(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Allocate the next transaction id, skipping any id that is still in
    /// flight. The in-flight count is bounded by the command queue depth, so
    /// this always terminates quickly.
    pub(crate) fn allocate(&mut self) -> TxId {
        loop {
            let candidate = self.next_tx.next();
            if !self.map.contains_key(&candidate.to_u16()) {
                return candidate;
            }
        }
    }

    pub(crate) fn insert(&mut self, tx_id: TxId, pending: Pending) {
        self.map.insert(tx_id.to_u16(), pending);
    }

    pub(crate) fn remove(&mut self, tx_id: TxId) -> Option<Pending> {
        self.map.remove(&tx_id.to_u16())
    }

    /// The earliest deadline of any outstanding request, if one exists
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.map.values().map(|x| x.deadline).min()
    }

    /// Remove and return every request whose deadline has passed
    pub(crate) fn pop_expired(&mut self, now: Instant) -> Vec<Pending> {
        let expired: Vec<u16> = self
            .map
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(tx_id, _)| *tx_id)
            .collect();

        expired
            .into_iter()
            .filter_map(|tx_id| self.map.remove(&tx_id))
            .collect()
    }

    /// Fail every outstanding request with the same error. Used when the
    /// connection is lost or the task shuts down.
    pub(crate) fn fail_all(&mut self, err: RequestError) {
        for (_, pending) in self.map.drain() {
            pending.request.fail(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::client::message::{Promise, Request, RequestDetails};
    use crate::client::requests::read_registers::ReadRegisters;
    use crate::types::{AddressRange, RequestParam, UnitId};

    fn pending_request() -> (
        Pending,
        tokio::sync::oneshot::Receiver<Result<Vec<crate::types::Indexed<u16>>, RequestError>>,
    ) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let param = RequestParam::new(UnitId::new(0x32), Duration::from_secs(1));
        let range = AddressRange::try_from(0, 1).unwrap();
        let request = Request::new(
            param,
            RequestDetails::ReadInputRegisters(ReadRegisters::new(range, Promise::new(tx))),
        );
        let pending = Pending {
            request,
            pdu: vec![0x04, 0x00, 0x00, 0x00, 0x01],
            deadline: Instant::now(),
            retries_left: 0,
        };
        (pending, rx)
    }

    #[tokio::test]
    async fn allocator_increments_sequentially() {
        let mut pending = PendingRequests::new();
        assert_eq!(pending.allocate(), TxId::new(0));
        assert_eq!(pending.allocate(), TxId::new(1));
        assert_eq!(pending.allocate(), TxId::new(2));
    }

    #[tokio::test]
    async fn allocator_skips_ids_still_in_flight() {
        let mut requests = PendingRequests::new();

        let tx_id = requests.allocate();
        assert_eq!(tx_id, TxId::new(0));
        let (pending, _rx) = pending_request();
        requests.insert(tx_id, pending);

        // force the allocator to wrap around to the in-flight id
        for _ in 0..(u16::MAX as u32) {
            let candidate = requests.allocate();
            assert_ne!(candidate, tx_id);
        }
    }

    #[tokio::test]
    async fn fail_all_completes_every_promise() {
        let mut requests = PendingRequests::new();
        let (pending, mut rx) = pending_request();
        let tx_id = requests.allocate();
        requests.insert(tx_id, pending);

        requests.fail_all(RequestError::Shutdown);

        assert!(requests.is_empty());
        assert_eq!(rx.try_recv().unwrap(), Err(RequestError::Shutdown));
    }

    #[tokio::test]
    async fn pop_expired_returns_only_elapsed_deadlines() {
        let mut requests = PendingRequests::new();

        let now = Instant::now();
        let (mut expired, _rx1) = pending_request();
        expired.deadline = now - Duration::from_millis(1);
        let (mut live, _rx2) = pending_request();
        live.deadline = now + Duration::from_secs(10);

        let id1 = requests.allocate();
        requests.insert(id1, expired);
        let id2 = requests.allocate();
        requests.insert(id2, live);

        assert_eq!(requests.pop_expired(now).len(), 1);
        assert_eq!(requests.next_deadline(), Some(now + Duration::from_secs(10)));
    }
}
