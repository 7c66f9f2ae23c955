/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Interest kinds a channel can arm and the ready events they produce.

use std::fmt::{Debug, Display, Formatter};
use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener, TcpStream as StdTcpStream};
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::mpsc::UnboundedSender;

const WATCH_BUFFER_SIZE: usize = 4096;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Identity of one armed interest inside a dispatcher.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RegistrationId(pub(crate) u64);

impl Display for RegistrationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}

/// I/O or timer readiness a channel waits for.
pub enum Interest {
    /// Complete an outbound connect on an already bound socket.
    Connect { socket: TcpSocket, remote: SocketAddr },
    /// Accept inbound connections until deregistered.
    Accept { listener: StdTcpListener },
    /// Watch an established socket for inbound bytes and peer close.
    Watch { stream: StdTcpStream },
    /// Fire once after `after` elapses.
    Timer { after: Duration },
}

impl Interest {
    pub fn kind(&self) -> &'static str {
        match self {
            Interest::Connect { .. } => "connect",
            Interest::Accept { .. } => "accept",
            Interest::Watch { .. } => "watch",
            Interest::Timer { .. } => "timer",
        }
    }
}

impl Debug for Interest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Interest::Connect { remote, .. } => {
                f.debug_struct("Connect").field("remote", remote).finish()
            }
            Interest::Accept { listener } => f
                .debug_struct("Accept")
                .field("local", &listener.local_addr().ok())
                .finish(),
            Interest::Watch { stream } => f
                .debug_struct("Watch")
                .field("peer", &stream.peer_addr().ok())
                .finish(),
            Interest::Timer { after } => f.debug_struct("Timer").field("after", after).finish(),
        }
    }
}

/// Completion delivered to an [`EventHandler`] on the dispatcher thread.
#[derive(Debug)]
pub enum ReadyEvent {
    Connected(StdTcpStream),
    ConnectFailed(io::Error),
    Accepted { stream: StdTcpStream, peer: SocketAddr },
    AcceptFailed(io::Error),
    Received(usize),
    PeerClosed,
    TimerExpired,
}

impl ReadyEvent {
    /// Terminal events end their interest; the dispatcher forgets the registration after them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReadyEvent::Connected(_)
                | ReadyEvent::ConnectFailed(_)
                | ReadyEvent::PeerClosed
                | ReadyEvent::TimerExpired
        )
    }
}

/// Callback invoked by the dispatcher, strictly one event at a time.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, registration: RegistrationId, event: ReadyEvent);
}

pub(crate) type ReadySender = UnboundedSender<(RegistrationId, ReadyEvent)>;

/// Drives one interest to completion on the dispatcher runtime, queueing its ready events.
pub(crate) async fn drive_interest(id: RegistrationId, interest: Interest, ready: ReadySender) {
    match interest {
        Interest::Connect { socket, remote } => {
            let event = match socket.connect(remote).await {
                Ok(stream) => match stream.into_std() {
                    Ok(stream) => ReadyEvent::Connected(stream),
                    Err(err) => ReadyEvent::ConnectFailed(err),
                },
                Err(err) => ReadyEvent::ConnectFailed(err),
            };
            let _ = ready.send((id, event));
        }
        Interest::Accept { listener } => {
            let listener = match TcpListener::from_std(listener) {
                Ok(listener) => listener,
                Err(err) => {
                    let _ = ready.send((id, ReadyEvent::AcceptFailed(err)));
                    return;
                }
            };
            loop {
                let event = match listener.accept().await {
                    Ok((stream, peer)) => match stream.into_std() {
                        Ok(stream) => ReadyEvent::Accepted { stream, peer },
                        Err(err) => ReadyEvent::AcceptFailed(err),
                    },
                    Err(err) => {
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        ReadyEvent::AcceptFailed(err)
                    }
                };
                if ready.send((id, event)).is_err() {
                    return;
                }
            }
        }
        Interest::Watch { stream } => {
            let stream = match TcpStream::from_std(stream) {
                Ok(stream) => stream,
                Err(_) => {
                    let _ = ready.send((id, ReadyEvent::PeerClosed));
                    return;
                }
            };
            let mut buffer = [0u8; WATCH_BUFFER_SIZE];
            loop {
                if stream.readable().await.is_err() {
                    let _ = ready.send((id, ReadyEvent::PeerClosed));
                    return;
                }
                match stream.try_read(&mut buffer) {
                    Ok(0) => {
                        let _ = ready.send((id, ReadyEvent::PeerClosed));
                        return;
                    }
                    Ok(received) => {
                        if ready.send((id, ReadyEvent::Received(received))).is_err() {
                            return;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => continue,
                    Err(_) => {
                        let _ = ready.send((id, ReadyEvent::PeerClosed));
                        return;
                    }
                }
            }
        }
        Interest::Timer { after } => {
            tokio::time::sleep(after).await;
            let _ = ready.send((id, ReadyEvent::TimerExpired));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{drive_interest, Interest, ReadyEvent, RegistrationId};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn timer_interest_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        drive_interest(
            RegistrationId(7),
            Interest::Timer {
                after: Duration::from_millis(5),
            },
            tx,
        )
        .await;

        let (id, event) = rx.recv().await.expect("timer should fire");
        assert_eq!(id, RegistrationId(7));
        assert!(matches!(event, ReadyEvent::TimerExpired));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn refused_connect_reports_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
        let remote = listener.local_addr().expect("probe address");
        drop(listener);

        let socket = tokio::net::TcpSocket::new_v4().expect("socket");
        let (tx, mut rx) = mpsc::unbounded_channel();

        drive_interest(RegistrationId(1), Interest::Connect { socket, remote }, tx).await;

        let (_, event) = rx.recv().await.expect("connect should complete");
        assert!(matches!(event, ReadyEvent::ConnectFailed(_)));
        assert!(event.is_terminal());
    }

    #[test]
    fn accept_and_receive_are_not_terminal() {
        assert!(!ReadyEvent::Received(1).is_terminal());
        assert!(ReadyEvent::PeerClosed.is_terminal());
    }
}
