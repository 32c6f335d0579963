//! The thread-safe ordered [`ClientRegistry`] of live [`ClientHandle`]s.
//!
//! Mirrors the teacher's `Db` rationale (`db.rs`): a plain `std::sync::Mutex`
//! is used instead of `tokio::sync::Mutex` because no `.await` point is ever
//! reached while the lock is held, and every critical section here is a
//! handful of `Vec` operations.
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::client::{ClientHandle, ClientSnapshot};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<Vec<Arc<ClientHandle>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at tail. Fails with `Error::AllocationFailure` only if a
    /// client with the same address is already registered (the descriptor
    /// uniqueness invariant of spec.md §8) — in practice two live
    /// connections can never share a `SocketAddr`, so this is a defensive
    /// check rather than a routine failure path.
    pub fn append(&self, handle: Arc<ClientHandle>) -> Result<()> {
        let mut clients = self.clients.lock().map_err(poison_err)?;
        if clients.iter().any(|c| c.addr() == handle.addr()) {
            return Err(Error::AllocationFailure);
        }
        clients.push(handle);
        Ok(())
    }

    /// Remove the first entry matching `addr`. Absent key is not an error.
    pub fn remove(&self, addr: SocketAddr) -> Result<()> {
        let mut clients = self.clients.lock().map_err(poison_err)?;
        clients.retain(|c| c.addr() != addr);
        Ok(())
    }

    /// A copied snapshot of the first entry, if any, at call time.
    pub fn head_snapshot(&self) -> Result<Option<ClientSnapshot>> {
        let clients = self.clients.lock().map_err(poison_err)?;
        Ok(clients.first().map(|c| ClientSnapshot { addr: c.addr() }))
    }

    /// Apply `f` to every stored handle under the lock, in insertion
    /// order, stopping early if `f` returns `false`.
    pub fn traverse(&self, mut f: impl FnMut(&Arc<ClientHandle>) -> bool) -> Result<()> {
        let clients = self.clients.lock().map_err(poison_err)?;
        for client in clients.iter() {
            if !f(client) {
                break;
            }
        }
        Ok(())
    }

    /// A copied snapshot of every live entry, in insertion order. The
    /// `Arc` clones keep each handle (and its write lock) alive even if a
    /// concurrent `remove` drops the registry's own reference mid-iteration
    /// by the caller — closing the race flagged in spec.md §9.
    pub fn snapshot(&self) -> Result<Vec<Arc<ClientHandle>>> {
        let clients = self.clients.lock().map_err(poison_err)?;
        Ok(clients.clone())
    }

    pub fn length(&self) -> Result<usize> {
        let clients = self.clients.lock().map_err(poison_err)?;
        Ok(clients.len())
    }
}

fn poison_err<T>(_: std::sync::PoisonError<T>) -> Error {
    Error::SynchronizationFailure("client registry lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn handle_pair() -> (Arc<ClientHandle>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let (accepted, _) = tokio::join!(listener.accept(), connect);
        let (stream, peer) = accepted.unwrap();
        let (_read, write) = stream.into_split();
        (Arc::new(ClientHandle::new(peer, write)), peer)
    }

    #[tokio::test]
    async fn append_then_length_then_remove() {
        let registry = ClientRegistry::new();
        let (handle, addr) = handle_pair().await;
        registry.append(handle).unwrap();
        assert_eq!(registry.length().unwrap(), 1);
        registry.remove(addr).unwrap();
        assert_eq!(registry.length().unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_of_absent_key_is_a_no_op() {
        let registry = ClientRegistry::new();
        let missing: SocketAddr = "127.0.0.1:1".parse().unwrap();
        registry.remove(missing).unwrap();
        assert_eq!(registry.length().unwrap(), 0);
    }

    #[tokio::test]
    async fn n_appends_then_m_removes_yields_n_minus_m() {
        let registry = ClientRegistry::new();
        let mut addrs = Vec::new();
        for _ in 0..4 {
            let (handle, addr) = handle_pair().await;
            registry.append(handle).unwrap();
            addrs.push(addr);
        }
        registry.remove(addrs[0]).unwrap();
        registry.remove(addrs[2]).unwrap();
        assert_eq!(registry.length().unwrap(), 2);
    }

    #[tokio::test]
    async fn head_snapshot_reflects_insertion_order() {
        let registry = ClientRegistry::new();
        let (first, first_addr) = handle_pair().await;
        registry.append(first).unwrap();
        let (second, _second_addr) = handle_pair().await;
        registry.append(second).unwrap();

        let head = registry.head_snapshot().unwrap().unwrap();
        assert_eq!(head.addr, first_addr);
    }
}
