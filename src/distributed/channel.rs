use std::sync::mpsc::{self, Receiver, Sender};

use log::trace;

use super::Partition;
use crate::{body::Body, Error};

/// The rank that loads the bodies and observes the simulation.
pub const ROOT: usize = 0;

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Count(usize),
    /// A contiguous range of the body array starting at `offset`.
    Bodies { offset: usize, bodies: Vec<Body> },
    Flag(bool),
    Barrier,
}

/// Point-to-point messaging between the workers of a cluster.
///
/// Messages from one worker to another arrive in the order they were sent. The
/// collectives are built on top of `send` and `receive`, every worker has to take
/// part in every collective, in the same order. A worker that goes away makes the
/// pending and all later calls of its peers fail with [`Error::Disconnected`].
pub trait Communicator {
    fn rank(&self) -> usize;

    /// Number of workers in the cluster.
    fn size(&self) -> usize;

    fn send(&self, to: usize, message: Message) -> Result<(), Error>;

    /// Block until the next message from `from` arrives.
    fn receive(&self, from: usize) -> Result<Message, Error>;

    /// Block until every worker has reached the barrier.
    fn barrier(&self) -> Result<(), Error> {
        let rank = self.rank();
        for peer in peers(rank, self.size()) {
            self.send(peer, Message::Barrier)?;
        }
        for peer in peers(rank, self.size()) {
            if self.receive(peer)? != Message::Barrier {
                return Err(Error::UnexpectedMessage {
                    rank,
                    expected: "the barrier",
                });
            }
        }
        Ok(())
    }

    /// Replace `bodies` on every worker by the bodies of [`ROOT`].
    fn broadcast_bodies(&self, bodies: &mut Vec<Body>) -> Result<(), Error> {
        let rank = self.rank();
        if rank == ROOT {
            for peer in peers(rank, self.size()) {
                self.send(peer, Message::Count(bodies.len()))?;
                self.send(
                    peer,
                    Message::Bodies {
                        offset: 0,
                        bodies: bodies.clone(),
                    },
                )?;
            }
        } else {
            let Message::Count(count) = self.receive(ROOT)? else {
                return Err(Error::UnexpectedMessage {
                    rank,
                    expected: "the body count",
                });
            };
            let Message::Bodies {
                offset,
                bodies: received,
            } = self.receive(ROOT)?
            else {
                return Err(Error::UnexpectedMessage {
                    rank,
                    expected: "the initial bodies",
                });
            };
            if offset != 0 {
                return Err(Error::OffsetMismatch {
                    rank,
                    from: ROOT,
                    expected: 0,
                    received: offset,
                });
            }
            if received.len() != count {
                return Err(Error::BodyCountMismatch {
                    rank,
                    expected: count,
                    received: received.len(),
                });
            }
            *bodies = received;
        }

        self.barrier()
    }

    /// Replace `flag` on every worker by the flag of [`ROOT`].
    fn broadcast_flag(&self, flag: &mut bool) -> Result<(), Error> {
        let rank = self.rank();
        if rank == ROOT {
            for peer in peers(rank, self.size()) {
                self.send(peer, Message::Flag(*flag))?;
            }
        } else {
            let Message::Flag(received) = self.receive(ROOT)? else {
                return Err(Error::UnexpectedMessage {
                    rank,
                    expected: "a flag",
                });
            };
            *flag = received;
        }

        self.barrier()
    }

    /// Publish the own range of `bodies` to every other worker and copy theirs in.
    ///
    /// Afterwards `bodies` is identical on every worker.
    fn exchange(&self, bodies: &mut [Body], partition: &Partition) -> Result<(), Error> {
        let rank = self.rank();
        let own = partition.range(rank);
        for peer in peers(rank, self.size()) {
            self.send(
                peer,
                Message::Bodies {
                    offset: own.start,
                    bodies: bodies[own.clone()].to_vec(),
                },
            )?;
        }

        for peer in peers(rank, self.size()) {
            let Message::Bodies {
                offset,
                bodies: received,
            } = self.receive(peer)?
            else {
                return Err(Error::UnexpectedMessage {
                    rank,
                    expected: "a body range",
                });
            };

            let range = partition.range(peer);
            if offset != range.start {
                return Err(Error::OffsetMismatch {
                    rank,
                    from: peer,
                    expected: range.start,
                    received: offset,
                });
            }
            if received.len() != range.len() {
                return Err(Error::BodyCountMismatch {
                    rank,
                    expected: range.len(),
                    received: received.len(),
                });
            }
            trace!("worker {rank} received bodies {range:?} from worker {peer}");
            bodies[range].copy_from_slice(&received);
        }

        self.barrier()
    }
}

fn peers(rank: usize, size: usize) -> impl Iterator<Item = usize> {
    (0..size).filter(move |&peer| peer != rank)
}

/// A [`Communicator`] for workers running on separate threads of one process.
///
/// Every ordered pair of workers has its own channel, nothing else is shared.
/// Dropping a communicator disconnects it from all of its peers.
#[derive(Debug)]
pub struct ChannelCommunicator {
    rank: usize,
    /// Indexed by the receiving rank, `None` for the own rank.
    outboxes: Vec<Option<Sender<Message>>>,
    /// Indexed by the sending rank, `None` for the own rank.
    inboxes: Vec<Option<Receiver<Message>>>,
}

impl ChannelCommunicator {
    /// One connected communicator per rank, ordered by rank.
    #[must_use]
    pub fn cluster(size: usize) -> Vec<Self> {
        let mut outboxes: Vec<Vec<_>> = (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<_>> = (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for from in 0..size {
            for to in peers(from, size) {
                let (sender, receiver) = mpsc::channel();
                outboxes[from][to] = Some(sender);
                inboxes[to][from] = Some(receiver);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| Self {
                rank,
                outboxes,
                inboxes,
            })
            .collect()
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, to: usize, message: Message) -> Result<(), Error> {
        self.outboxes
            .get(to)
            .and_then(Option::as_ref)
            .ok_or(Error::Disconnected { rank: to })?
            .send(message)
            .map_err(|_| Error::Disconnected { rank: to })
    }

    fn receive(&self, from: usize) -> Result<Message, Error> {
        self.inboxes
            .get(from)
            .and_then(Option::as_ref)
            .ok_or(Error::Disconnected { rank: from })?
            .recv()
            .map_err(|_| Error::Disconnected { rank: from })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::Vec2;

    /// Run `f` on every rank of a channel cluster and collect the results by rank.
    fn on_cluster<T: Send>(
        size: usize,
        f: impl Fn(ChannelCommunicator) -> T + Sync,
    ) -> Vec<T> {
        let f = &f;
        thread::scope(|s| {
            let handles: Vec<_> = ChannelCommunicator::cluster(size)
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        })
    }

    fn bodies(n: usize) -> Vec<Body> {
        (0..n)
            .map(|i| Body::at_rest(i, Vec2::new(i as f64 * 0.1, 1.), 1.))
            .collect()
    }

    #[test]
    fn broadcast_bodies() {
        let received = on_cluster(4, |comm| {
            let mut local = if comm.rank() == ROOT {
                bodies(10)
            } else {
                Vec::new()
            };
            comm.broadcast_bodies(&mut local).unwrap();
            local
        });

        for local in received {
            assert_eq!(local, bodies(10));
        }
    }

    #[test]
    fn broadcast_flag() {
        let flags = on_cluster(3, |comm| {
            let mut flag = comm.rank() == ROOT;
            comm.broadcast_flag(&mut flag).unwrap();
            flag
        });

        assert_eq!(flags, vec![true; 3]);
    }

    #[test]
    fn exchange_makes_arrays_consistent() {
        let n = 11;
        let size = 3;
        let partition = Partition::new(n, size).unwrap();

        let arrays = on_cluster(size, |comm| {
            let mut local = bodies(n);
            // only the own range is up to date
            for body in &mut local[partition.range(comm.rank())] {
                body.velocity = Vec2::new(comm.rank() as f64, 1.);
            }
            comm.exchange(&mut local, &partition).unwrap();
            local
        });

        for local in &arrays {
            assert_eq!(local, &arrays[0]);
        }
        for rank in 0..size {
            for body in &arrays[0][partition.range(rank)] {
                assert_eq!(body.velocity, Vec2::new(rank as f64, 1.));
            }
        }
    }

    #[test]
    fn collectives_can_follow_each_other() {
        let n = 6;
        let partition = Partition::new(n, 2).unwrap();

        let arrays = on_cluster(2, |comm| {
            let mut local = Vec::new();
            if comm.rank() == ROOT {
                local = bodies(n);
            }
            comm.broadcast_bodies(&mut local).unwrap();

            for round in 0..5 {
                for body in &mut local[partition.range(comm.rank())] {
                    body.position.y += round as f64;
                }
                comm.exchange(&mut local, &partition).unwrap();
            }
            local
        });

        assert_eq!(arrays[0], arrays[1]);
        assert!(arrays[0].iter().all(|body| body.position.y == 11.));
    }

    #[test]
    fn single_worker() {
        let mut comm = ChannelCommunicator::cluster(1);
        let comm = comm.remove(0);
        let mut local = bodies(3);

        comm.broadcast_bodies(&mut local).unwrap();
        comm.exchange(&mut local, &Partition::new(3, 1).unwrap())
            .unwrap();
        assert_eq!(local, bodies(3));
    }

    #[test]
    fn dropped_peer_disconnects() {
        let mut comms = ChannelCommunicator::cluster(3);
        let last = comms.pop().unwrap();
        drop(last);

        let root = &comms[0];
        assert!(matches!(
            root.receive(2),
            Err(Error::Disconnected { rank: 2 })
        ));
        assert!(matches!(
            root.send(2, Message::Barrier),
            Err(Error::Disconnected { rank: 2 })
        ));
        assert!(matches!(root.barrier(), Err(Error::Disconnected { .. })));
        // no channel to the own rank
        assert!(matches!(
            root.send(0, Message::Barrier),
            Err(Error::Disconnected { rank: 0 })
        ));
    }

    #[test]
    fn wrong_offset_is_reported() {
        let partition = Partition::new(4, 2).unwrap();
        let mut comms = ChannelCommunicator::cluster(2);
        let peer = comms.pop().unwrap();
        let root = comms.pop().unwrap();

        // right length, shifted by one
        peer.send(
            ROOT,
            Message::Bodies {
                offset: 1,
                bodies: bodies(2),
            },
        )
        .unwrap();

        let err = root.exchange(&mut bodies(4), &partition).unwrap_err();
        assert!(
            matches!(
                err,
                Error::OffsetMismatch {
                    rank: 0,
                    from: 1,
                    expected: 2,
                    received: 1,
                }
            ),
            "{err}"
        );
    }
}
