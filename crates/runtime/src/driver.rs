// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Driver-node protocol and the in-process device simulator.
//!
//! A [`DriverNode`] is the seam between the runtime and a device: the ioctl
//! families of the character device (open/close, graph load, format
//! negotiation, stream control, parameter writes, buffer queueing) expressed
//! as a trait, so task interfaces run unchanged against real hardware or the
//! bundled [`SimNode`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use task_ir::descriptor::{
    WireHeader, HEADER_BYTES, INVOKE_PARAM_BYTES, PROCESS_BASE_BYTES, PU_BYTES, PU_PARAM_BYTES,
    SUBCHAIN_BYTES, TRAILER_MAGIC, VERTEX_BYTES,
};

use crate::error::DriverError;

/// Queue depth a node is given when the configuration does not say.
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

// ── Wire-level buffer descriptions ──────────────────────────────────────────

/// Transfer direction, device-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host memory into the device.
    In,
    /// Device results back to host memory.
    Out,
}

impl Direction {
    pub(crate) fn index(self) -> usize {
        match self {
            Direction::In => 0,
            Direction::Out => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => f.write_str("in"),
            Direction::Out => f.write_str("out"),
        }
    }
}

/// Pixel layout of a DMA endpoint, fourcc-style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Gray16,
    Rgb888,
    Rgba8888,
    /// Coordinate records instead of a raster; produced and consumed by
    /// point-list DMA endpoints.
    PointList,
}

impl PixelFormat {
    /// Raster format for the given bytes per pixel, if one exists.
    pub fn for_pixel_bytes(pixel_bytes: u16) -> Option<Self> {
        match pixel_bytes {
            1 => Some(PixelFormat::Gray8),
            2 => Some(PixelFormat::Gray16),
            3 => Some(PixelFormat::Rgb888),
            4 => Some(PixelFormat::Rgba8888),
            _ => None,
        }
    }

    /// Four-character code as the device ioctls encode it.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            PixelFormat::Gray8 => *b"GRY8",
            PixelFormat::Gray16 => *b"GY16",
            PixelFormat::Rgb888 => *b"RGB3",
            PixelFormat::Rgba8888 => *b"RGB4",
            PixelFormat::PointList => *b"PLST",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Gray8 => "GRY8",
            PixelFormat::Gray16 => "GY16",
            PixelFormat::Rgb888 => "RGB3",
            PixelFormat::Rgba8888 => "RGB4",
            PixelFormat::PointList => "PLST",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rectangle of interest within a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// One plane of device-visible memory, named by file descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub fd: i32,
    pub len: usize,
    /// Sub-rectangle the device should touch; `None` means the full extent.
    pub roi: Option<Roi>,
}

/// Geometry of one plane of one DMA endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortFormat {
    /// Wire index of the DMA processing unit this plane belongs to.
    pub target: u16,
    pub plane: u8,
    pub pixel_format: PixelFormat,
    pub width: u16,
    pub height: u16,
    pub pixel_bytes: u16,
}

/// Buffers for every plane of one DMA endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PortBuffers {
    pub target: u16,
    pub planes: Vec<BufferDesc>,
}

/// One direction of one frame: a container per external-backed DMA
/// endpoint, tagged with the frame id and the parameter-set selector the
/// completion must echo back.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferBunch {
    pub frame_id: u32,
    /// Parameter-set selector; see `TaskIf::find_io_index`.
    pub index: u32,
    pub containers: Vec<PortBuffers>,
}

/// Measurement points stamped on a frame as it moves through the device.
#[derive(Debug, Clone, Copy)]
pub struct QueueTimestamps {
    pub queued: Instant,
    pub submitted: Instant,
    pub started: Instant,
    pub done: Instant,
    pub dequeued: Instant,
}

impl QueueTimestamps {
    /// All five points collapsed onto the queue instant.
    pub fn at_queue(now: Instant) -> Self {
        Self {
            queued: now,
            submitted: now,
            started: now,
            done: now,
            dequeued: now,
        }
    }

    /// Host-observed latency from queue to completion.
    pub fn queue_to_done(&self) -> Duration {
        self.done.duration_since(self.queued)
    }

    /// Time the frame spent on the device proper.
    pub fn device_residency(&self) -> Duration {
        self.done.duration_since(self.started)
    }
}

/// A finished frame handed back by [`DriverNode::dequeue`].
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub frame_id: u32,
    pub index: u32,
    pub timestamps: QueueTimestamps,
}

// ── Driver protocol ─────────────────────────────────────────────────────────

/// The device seam.
///
/// One implementor per device node. All methods take `&mut self` because a
/// node is owned by exactly one task interface; implementors must be `Send`
/// so interfaces can move across threads.
pub trait DriverNode: Send {
    /// Short name for logs ("sim", "vpu0", ...).
    fn name(&self) -> &str;

    fn open(&mut self) -> Result<(), DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;

    /// Load a serialized task graph, trailer included.
    fn set_graph(&mut self, descriptor: &[u8]) -> Result<(), DriverError>;

    /// Describe every plane the bunches of one direction will carry.
    fn set_format(&mut self, direction: Direction, formats: &[PortFormat])
        -> Result<(), DriverError>;

    fn stream_on(&mut self) -> Result<(), DriverError>;

    fn stream_off(&mut self) -> Result<(), DriverError>;

    /// Rewrite one processing unit's parameter block in place.
    fn set_param(&mut self, target: u32, bytes: &[u8]) -> Result<(), DriverError>;

    /// Hand one direction of one frame to the device.
    fn queue(&mut self, direction: Direction, bunch: &BufferBunch) -> Result<(), DriverError>;

    /// Collect the oldest finished frame for one direction.
    fn dequeue(&mut self, direction: Direction) -> Result<Completion, DriverError>;
}

// ── Simulator ───────────────────────────────────────────────────────────────

/// Counters and captures the simulator records for inspection.
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    pub frames_queued: u64,
    pub frames_dequeued: u64,
    pub stream_cycles: u32,
    pub param_writes: Vec<(u32, Vec<u8>)>,
}

#[derive(Debug)]
struct Pending {
    frame_id: u32,
    index: u32,
    queued: Instant,
}

/// In-process device model.
///
/// Enforces the same ordering rules as the real node (open before graph,
/// graph before formats, formats before streaming) and completes frames
/// first-in first-out with fabricated timestamps.
#[derive(Debug)]
pub struct SimNode {
    queue_depth: usize,
    open: bool,
    streaming: bool,
    graph_pus: Option<u16>,
    formats: [Vec<PortFormat>; 2],
    queues: [VecDeque<Pending>; 2],
    stats: Arc<Mutex<SimStats>>,
}

// The stats mutex guards plain counters; a poisoned lock still holds a
// usable value.
fn lock(stats: &Mutex<SimStats>) -> MutexGuard<'_, SimStats> {
    match stats.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SimNode {
    pub fn new(queue_depth: usize) -> Self {
        Self {
            queue_depth: queue_depth.max(1),
            open: false,
            streaming: false,
            graph_pus: None,
            formats: [Vec::new(), Vec::new()],
            queues: [VecDeque::new(), VecDeque::new()],
            stats: Arc::default(),
        }
    }

    /// Handle onto the stats block; stays live after the node is boxed
    /// behind a [`DriverNode`].
    pub fn stats_handle(&self) -> Arc<Mutex<SimStats>> {
        Arc::clone(&self.stats)
    }

    /// Snapshot of the counters so far.
    pub fn stats(&self) -> SimStats {
        lock(&self.stats).clone()
    }

    fn state_name(&self) -> &'static str {
        if !self.open {
            "closed"
        } else if self.streaming {
            "streaming"
        } else if self.graph_pus.is_none() {
            "open without a graph"
        } else {
            "open"
        }
    }
}

impl Default for SimNode {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

impl DriverNode for SimNode {
    fn name(&self) -> &str {
        "sim"
    }

    fn open(&mut self) -> Result<(), DriverError> {
        if self.open {
            return Err(DriverError::InvalidState {
                op: "open",
                state: self.state_name(),
            });
        }
        self.open = true;
        tracing::debug!(depth = self.queue_depth, "sim device opened");
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if !self.open {
            return Err(DriverError::InvalidState {
                op: "close",
                state: "closed",
            });
        }
        self.open = false;
        self.streaming = false;
        self.graph_pus = None;
        for f in &mut self.formats {
            f.clear();
        }
        for q in &mut self.queues {
            q.clear();
        }
        tracing::debug!("sim device closed");
        Ok(())
    }

    fn set_graph(&mut self, descriptor: &[u8]) -> Result<(), DriverError> {
        if !self.open || self.streaming {
            return Err(DriverError::InvalidState {
                op: "set_graph",
                state: self.state_name(),
            });
        }
        let trailer = TRAILER_MAGIC.len();
        if descriptor.len() < HEADER_BYTES + trailer {
            return Err(DriverError::BadDescriptor {
                detail: format!(
                    "{} bytes is shorter than a header and trailer",
                    descriptor.len()
                ),
            });
        }
        let h = WireHeader::read(descriptor);
        let body = HEADER_BYTES
            + h.n_vertices as usize * VERTEX_BYTES
            + h.n_subchains as usize * SUBCHAIN_BYTES
            + h.n_pus as usize * PU_BYTES
            + h.n_bases_3dnn as usize * PROCESS_BASE_BYTES
            + h.n_invoke_params as usize * INVOKE_PARAM_BYTES;
        if h.total_size as usize != body {
            return Err(DriverError::BadDescriptor {
                detail: format!(
                    "total size {} does not match section counts ({body} bytes)",
                    h.total_size
                ),
            });
        }
        if descriptor.len() != body + trailer {
            return Err(DriverError::BadDescriptor {
                detail: format!(
                    "buffer is {} bytes, contents say {}",
                    descriptor.len(),
                    body + trailer
                ),
            });
        }
        if descriptor[body..] != TRAILER_MAGIC {
            return Err(DriverError::BadDescriptor {
                detail: "trailer magic missing".into(),
            });
        }
        self.graph_pus = Some(h.n_pus);
        // A new graph invalidates formats negotiated for the old one.
        for f in &mut self.formats {
            f.clear();
        }
        tracing::debug!(task = h.id, pus = h.n_pus, "sim device accepted graph");
        Ok(())
    }

    fn set_format(
        &mut self,
        direction: Direction,
        formats: &[PortFormat],
    ) -> Result<(), DriverError> {
        if !self.open || self.streaming {
            return Err(DriverError::InvalidState {
                op: "set_format",
                state: self.state_name(),
            });
        }
        let Some(n_pus) = self.graph_pus else {
            return Err(DriverError::InvalidState {
                op: "set_format",
                state: self.state_name(),
            });
        };
        if formats.is_empty() {
            return Err(DriverError::BadFormat {
                detail: format!("empty {direction} format list"),
            });
        }
        for f in formats {
            if f.target >= n_pus {
                return Err(DriverError::BadFormat {
                    detail: format!("target {} is outside the {n_pus}-unit graph", f.target),
                });
            }
            if f.width == 0 || f.height == 0 || f.pixel_bytes == 0 {
                return Err(DriverError::BadFormat {
                    detail: format!("target {} has a zero extent", f.target),
                });
            }
        }
        self.formats[direction.index()] = formats.to_vec();
        tracing::debug!(%direction, planes = formats.len(), "sim device formats set");
        Ok(())
    }

    fn stream_on(&mut self) -> Result<(), DriverError> {
        if !self.open || self.streaming || self.graph_pus.is_none() {
            return Err(DriverError::InvalidState {
                op: "stream_on",
                state: self.state_name(),
            });
        }
        if self.formats.iter().any(Vec::is_empty) {
            return Err(DriverError::InvalidState {
                op: "stream_on",
                state: "open without formats",
            });
        }
        self.streaming = true;
        lock(&self.stats).stream_cycles += 1;
        tracing::debug!("sim device streaming");
        Ok(())
    }

    fn stream_off(&mut self) -> Result<(), DriverError> {
        if !self.streaming {
            return Err(DriverError::InvalidState {
                op: "stream_off",
                state: self.state_name(),
            });
        }
        self.streaming = false;
        // In-flight frames are discarded, as the hardware does.
        for q in &mut self.queues {
            q.clear();
        }
        tracing::debug!("sim device stopped");
        Ok(())
    }

    fn set_param(&mut self, target: u32, bytes: &[u8]) -> Result<(), DriverError> {
        if !self.open {
            return Err(DriverError::InvalidState {
                op: "set_param",
                state: "closed",
            });
        }
        let Some(n_pus) = self.graph_pus else {
            return Err(DriverError::InvalidState {
                op: "set_param",
                state: self.state_name(),
            });
        };
        if target >= u32::from(n_pus) {
            return Err(DriverError::UnknownTarget { target });
        }
        if bytes.len() > PU_PARAM_BYTES {
            return Err(DriverError::BadParam {
                len: bytes.len(),
                limit: PU_PARAM_BYTES,
            });
        }
        lock(&self.stats).param_writes.push((target, bytes.to_vec()));
        Ok(())
    }

    fn queue(&mut self, direction: Direction, bunch: &BufferBunch) -> Result<(), DriverError> {
        if !self.streaming {
            return Err(DriverError::InvalidState {
                op: "queue",
                state: self.state_name(),
            });
        }
        let Some(n_pus) = self.graph_pus else {
            return Err(DriverError::InvalidState {
                op: "queue",
                state: self.state_name(),
            });
        };
        if self.queues[direction.index()].len() >= self.queue_depth {
            return Err(DriverError::QueueFull {
                direction,
                depth: self.queue_depth,
            });
        }
        for c in &bunch.containers {
            if c.target >= n_pus {
                return Err(DriverError::UnknownTarget {
                    target: u32::from(c.target),
                });
            }
            if c.planes.is_empty() {
                return Err(DriverError::BadFormat {
                    detail: format!("target {} queued with no planes", c.target),
                });
            }
        }
        self.queues[direction.index()].push_back(Pending {
            frame_id: bunch.frame_id,
            index: bunch.index,
            queued: Instant::now(),
        });
        lock(&self.stats).frames_queued += 1;
        Ok(())
    }

    fn dequeue(&mut self, direction: Direction) -> Result<Completion, DriverError> {
        if !self.streaming {
            return Err(DriverError::InvalidState {
                op: "dequeue",
                state: self.state_name(),
            });
        }
        let Some(p) = self.queues[direction.index()].pop_front() else {
            return Err(DriverError::QueueEmpty { direction });
        };
        let now = Instant::now();
        let half = now.duration_since(p.queued) / 2;
        let timestamps = QueueTimestamps {
            queued: p.queued,
            submitted: p.queued,
            started: p.queued + half,
            done: now,
            dequeued: now,
        };
        lock(&self.stats).frames_dequeued += 1;
        Ok(Completion {
            frame_id: p.frame_id,
            index: p.index,
            timestamps,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(n_pus: u16) -> Vec<u8> {
        let body = HEADER_BYTES + n_pus as usize * PU_BYTES;
        let mut buf = vec![0u8; body + TRAILER_MAGIC.len()];
        let header = WireHeader {
            id: 7,
            priority: 0,
            n_vertices: 0,
            n_subchains: 0,
            n_pus,
            n_bases_3dnn: 0,
            n_invoke_params: 0,
            flags: 0,
            vertices_vec_ofs: 0,
            sc_vec_ofs: 0,
            pus_vec_ofs: if n_pus == 0 { 0 } else { HEADER_BYTES as u32 },
            bases_3dnn_vec_ofs: 0,
            invoke_params_vec_ofs: 0,
            total_size: body as u32,
        };
        header.write(&mut buf);
        buf[body..].copy_from_slice(&TRAILER_MAGIC);
        buf
    }

    fn fmt(target: u16) -> PortFormat {
        PortFormat {
            target,
            plane: 0,
            pixel_format: PixelFormat::Gray8,
            width: 64,
            height: 64,
            pixel_bytes: 1,
        }
    }

    fn bunch(frame_id: u32, index: u32, target: u16) -> BufferBunch {
        BufferBunch {
            frame_id,
            index,
            containers: vec![PortBuffers {
                target,
                planes: vec![BufferDesc {
                    fd: 1000,
                    len: 4096,
                    roi: None,
                }],
            }],
        }
    }

    fn streaming_sim(depth: usize) -> SimNode {
        let mut sim = SimNode::new(depth);
        sim.open().unwrap();
        sim.set_graph(&descriptor(2)).unwrap();
        sim.set_format(Direction::In, &[fmt(0)]).unwrap();
        sim.set_format(Direction::Out, &[fmt(1)]).unwrap();
        sim.stream_on().unwrap();
        sim
    }

    #[test]
    fn test_ordering_enforced() {
        let mut sim = SimNode::new(2);
        assert!(matches!(
            sim.set_graph(&descriptor(1)),
            Err(DriverError::InvalidState { op: "set_graph", .. })
        ));
        sim.open().unwrap();
        assert!(matches!(
            sim.set_format(Direction::In, &[fmt(0)]),
            Err(DriverError::InvalidState { op: "set_format", .. })
        ));
        assert!(matches!(
            sim.stream_on(),
            Err(DriverError::InvalidState { op: "stream_on", .. })
        ));
        sim.set_graph(&descriptor(1)).unwrap();
        // Formats must cover both directions before streaming starts.
        sim.set_format(Direction::In, &[fmt(0)]).unwrap();
        assert!(matches!(
            sim.stream_on(),
            Err(DriverError::InvalidState {
                state: "open without formats",
                ..
            })
        ));
    }

    #[test]
    fn test_open_twice_rejected() {
        let mut sim = SimNode::new(2);
        sim.open().unwrap();
        assert!(matches!(
            sim.open(),
            Err(DriverError::InvalidState { op: "open", .. })
        ));
    }

    #[test]
    fn test_close_resets_graph() {
        let mut sim = SimNode::new(2);
        sim.open().unwrap();
        sim.set_graph(&descriptor(1)).unwrap();
        sim.close().unwrap();
        sim.open().unwrap();
        assert!(matches!(
            sim.set_format(Direction::In, &[fmt(0)]),
            Err(DriverError::InvalidState {
                state: "open without a graph",
                ..
            })
        ));
    }

    #[test]
    fn test_set_graph_rejects_corruption() {
        let mut sim = SimNode::new(2);
        sim.open().unwrap();

        assert!(matches!(
            sim.set_graph(&[0u8; 8]),
            Err(DriverError::BadDescriptor { .. })
        ));

        let mut wrong_total = descriptor(1);
        wrong_total[36] ^= 0xFF;
        assert!(matches!(
            sim.set_graph(&wrong_total),
            Err(DriverError::BadDescriptor { .. })
        ));

        let mut bad_trailer = descriptor(1);
        let n = bad_trailer.len();
        bad_trailer[n - 1] = b'?';
        assert!(matches!(
            sim.set_graph(&bad_trailer),
            Err(DriverError::BadDescriptor { .. })
        ));

        // The untouched descriptor is still accepted afterwards.
        sim.set_graph(&descriptor(1)).unwrap();
    }

    #[test]
    fn test_format_validation() {
        let mut sim = SimNode::new(2);
        sim.open().unwrap();
        sim.set_graph(&descriptor(2)).unwrap();

        assert!(matches!(
            sim.set_format(Direction::In, &[]),
            Err(DriverError::BadFormat { .. })
        ));
        assert!(matches!(
            sim.set_format(Direction::In, &[fmt(5)]),
            Err(DriverError::BadFormat { .. })
        ));
        let mut zero = fmt(0);
        zero.width = 0;
        assert!(matches!(
            sim.set_format(Direction::In, &[zero]),
            Err(DriverError::BadFormat { .. })
        ));
    }

    #[test]
    fn test_fifo_completion_order() {
        let mut sim = streaming_sim(4);
        sim.queue(Direction::In, &bunch(10, 0, 0)).unwrap();
        sim.queue(Direction::In, &bunch(11, 1, 0)).unwrap();

        let first = sim.dequeue(Direction::In).unwrap();
        let second = sim.dequeue(Direction::In).unwrap();
        assert_eq!(first.frame_id, 10);
        assert_eq!(first.index, 0);
        assert_eq!(second.frame_id, 11);
        assert_eq!(second.index, 1);
    }

    #[test]
    fn test_queue_depth_enforced() {
        let mut sim = streaming_sim(2);
        sim.queue(Direction::In, &bunch(0, 0, 0)).unwrap();
        sim.queue(Direction::In, &bunch(1, 0, 0)).unwrap();
        assert!(matches!(
            sim.queue(Direction::In, &bunch(2, 0, 0)),
            Err(DriverError::QueueFull { depth: 2, .. })
        ));
        // The other direction has its own slots.
        sim.queue(Direction::Out, &bunch(0, 0, 1)).unwrap();
    }

    #[test]
    fn test_dequeue_empty() {
        let mut sim = streaming_sim(2);
        assert!(matches!(
            sim.dequeue(Direction::Out),
            Err(DriverError::QueueEmpty {
                direction: Direction::Out
            })
        ));
    }

    #[test]
    fn test_queue_rejects_unknown_target() {
        let mut sim = streaming_sim(4);
        assert!(matches!(
            sim.queue(Direction::In, &bunch(0, 0, 9)),
            Err(DriverError::UnknownTarget { target: 9 })
        ));
    }

    #[test]
    fn test_param_limit_and_target() {
        let mut sim = SimNode::new(2);
        sim.open().unwrap();
        sim.set_graph(&descriptor(2)).unwrap();

        assert!(matches!(
            sim.set_param(9, &[0u8; 4]),
            Err(DriverError::UnknownTarget { target: 9 })
        ));
        assert!(matches!(
            sim.set_param(0, &[0u8; PU_PARAM_BYTES + 1]),
            Err(DriverError::BadParam { .. })
        ));

        sim.set_param(1, &[0xAB; 8]).unwrap();
        let stats = sim.stats();
        assert_eq!(stats.param_writes, vec![(1, vec![0xAB; 8])]);
    }

    #[test]
    fn test_timestamps_ordered() {
        let mut sim = streaming_sim(2);
        sim.queue(Direction::Out, &bunch(3, 0, 1)).unwrap();
        let done = sim.dequeue(Direction::Out).unwrap();
        let ts = done.timestamps;
        assert!(ts.queued <= ts.started);
        assert!(ts.started <= ts.done);
        assert!(ts.done <= ts.dequeued);
        assert!(ts.device_residency() <= ts.queue_to_done());
    }

    #[test]
    fn test_stream_off_discards_pending() {
        let mut sim = streaming_sim(2);
        sim.queue(Direction::In, &bunch(0, 0, 0)).unwrap();
        sim.stream_off().unwrap();
        sim.stream_on().unwrap();
        assert!(matches!(
            sim.dequeue(Direction::In),
            Err(DriverError::QueueEmpty { .. })
        ));
        assert_eq!(sim.stats().stream_cycles, 2);
    }

    #[test]
    fn test_pixel_format_codes() {
        assert_eq!(PixelFormat::for_pixel_bytes(1), Some(PixelFormat::Gray8));
        assert_eq!(PixelFormat::for_pixel_bytes(3), Some(PixelFormat::Rgb888));
        assert_eq!(PixelFormat::for_pixel_bytes(7), None);
        assert_eq!(&PixelFormat::PointList.fourcc(), b"PLST");
        assert_eq!(PixelFormat::Gray16.to_string(), "GY16");
    }
}
