use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    broker::{Connection, Connector},
    error::ProducerError,
    pacing::PacingPlan
};



/// Worker's view of its assigned connection.
///
/// Workers mapped onto the same connection hold clones of the same
/// handle, the mutex serializes their sends so a connection never
/// carries two batches at once.
pub struct ConnectionHandle<C> {
    index: usize,
    conn: Arc<Mutex<C>>
}

impl<C> Clone for ConnectionHandle<C> {
    fn clone(&self) -> Self {
        ConnectionHandle {
            index: self.index,
            conn: self.conn.clone()
        }
    }
}

impl<C> ConnectionHandle<C> {

    pub fn new(index: usize, conn: C) -> Self {
        ConnectionHandle {
            index,
            conn: Arc::new(Mutex::new(conn))
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// wait for exclusive use of the connection
    pub async fn lock(&self) -> MutexGuard<'_, C> {
        self.conn.lock().await
    }
}



/// Fixed set of long-lived broker connections, sized from the pacing plan
/// and independent of the worker count.
pub struct BrokerConnectionPool<C> {
    connections: Vec<ConnectionHandle<C>>,
    workers_per_connection: usize
}

impl<C> BrokerConnectionPool<C>
where
    C: Connection
{

    /// Open `plan.connection_count` connections.
    ///
    /// Fails fast on the first connection that cannot be opened,
    /// closing the ones already opened before returning the error.
    pub async fn open<K>(connector: &K,
                         endpoints: &[String],
                         plan: &PacingPlan) -> Result<Self, ProducerError>
    where
        K: Connector<Conn = C>
    {
        if plan.connection_count == 0 || plan.workers_per_connection == 0 {
            return Err(ProducerError::config("pacing plan needs at least one connection"))
        }

        let mut connections = Vec::with_capacity(plan.connection_count);

        for index in 0..plan.connection_count {
            match connector.open(endpoints, index).await {
                Ok(conn) => {
                    tracing::debug!(connection = index, "broker connection opened");
                    connections.push(ConnectionHandle::new(index, conn));
                }
                Err(source) => {

                    // no leaked sessions from a half-built pool
                    for handle in connections.iter() {
                        handle.lock().await.close().await;
                    }

                    return Err(ProducerError::Connection { index, source })
                }
            }
        }

        Ok(BrokerConnectionPool {
            connections,
            workers_per_connection: plan.workers_per_connection
        })
    }


    /// Build a pool from already opened connections
    pub fn from_connections(connections: Vec<C>, workers_per_connection: usize) -> Result<Self, ProducerError> {

        if connections.is_empty() {
            return Err(ProducerError::config("connection pool needs at least one connection"))
        }

        if workers_per_connection == 0 {
            return Err(ProducerError::config("workers_per_connection must be at least 1"))
        }

        Ok(BrokerConnectionPool {
            connections: connections
                .into_iter()
                .enumerate()
                .map(|(index, conn)| ConnectionHandle::new(index, conn))
                .collect(),
            workers_per_connection
        })
    }


    #[inline]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[inline]
    pub fn workers_per_connection(&self) -> usize {
        self.workers_per_connection
    }


    /// Connection index for `worker`: contiguous blocks of
    /// `workers_per_connection` workers share one connection.
    ///
    /// Clamped to the last connection for workers beyond the sized range.
    #[inline]
    pub fn index_for(&self, worker: usize) -> usize {
        (worker / self.workers_per_connection).min(self.connections.len() - 1)
    }

    pub fn assign(&self, worker: usize) -> ConnectionHandle<C> {
        self.connections[self.index_for(worker)].clone()
    }


    /// connection index -> workers mapped onto it, for `workers` workers
    pub fn assignments(&self, workers: usize) -> IndexMap<usize, Vec<usize>> {
        let mut table: IndexMap<usize, Vec<usize>> = IndexMap::with_capacity(self.connections.len());

        for worker in 0..workers {
            table.entry(self.index_for(worker))
                 .or_insert_with(Vec::new)
                 .push(worker);
        }

        table
    }


    /// Close every connection, once all dependent workers have exited
    pub async fn close_all(&self) {
        for handle in self.connections.iter() {
            handle.lock().await.close().await;
            tracing::debug!(connection = handle.index(), "broker connection closed");
        }
    }
}
