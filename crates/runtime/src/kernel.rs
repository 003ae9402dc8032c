// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Kernel: an ordered group of task interfaces invoked as one unit.
//!
//! A [`Kernel`] owns its task interfaces and runs them frame by frame in
//! registration order. Tasks that feed each other through device memory are
//! wired with [`Kernel::set_inter_pair`], which allies the producer's
//! intermediate slot with the consumer's so one buffer serves both sides.
//!
//! Every device-touching entry point funnels through one process-wide gate:
//! the accelerator is a single piece of hardware, however many kernels the
//! process builds.

use std::sync::{Mutex, MutexGuard};

use device_mem::DeviceAllocator;
use task_ir::{ExtMemId, PuId, PuKind, Resolved, Task, UpdatableId};

use crate::error::RuntimeError;
use crate::taskif::{FrameResult, TaskIf};

// One accelerator per process: every kernel, whatever thread it lives on,
// serializes its device work here.
static KERNEL_GATE: Mutex<()> = Mutex::new(());

// The gate guards no data; a poisoned lock is still a valid gate.
fn device_gate() -> MutexGuard<'static, ()> {
    match KERNEL_GATE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Names one DMA-out / DMA-in pairing across two task interfaces.
#[derive(Debug, Clone, Copy)]
pub struct InterPair {
    /// Index of the producing task interface.
    pub out_task: usize,
    /// The producer's DMA-out unit.
    pub out_pu: PuId,
    /// Index of the consuming task interface.
    pub in_task: usize,
    /// The consumer's DMA-in unit.
    pub in_pu: PuId,
}

/// Caller-supplied I/O buffers for one task, one frame.
#[derive(Debug, Clone, Default)]
pub struct TaskBuffers {
    pub io_in: Vec<crate::driver::BufferDesc>,
    pub io_out: Vec<crate::driver::BufferDesc>,
}

/// One frame across every task interface of a kernel, registration order.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub frame_id: u32,
    pub buffers: Vec<TaskBuffers>,
}

/// An ordered group of task interfaces driven as one unit.
#[derive(Debug)]
pub struct Kernel {
    name: String,
    taskifs: Vec<TaskIf>,
}

impl Kernel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            taskifs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a task interface; frames visit interfaces in this order.
    pub fn add_taskif(&mut self, taskif: TaskIf) -> usize {
        self.taskifs.push(taskif);
        self.taskifs.len() - 1
    }

    pub fn taskif(&self, index: usize) -> Option<&TaskIf> {
        self.taskifs.get(index)
    }

    pub fn taskif_mut(&mut self, index: usize) -> Option<&mut TaskIf> {
        self.taskifs.get_mut(index)
    }

    pub fn taskifs(&self) -> &[TaskIf] {
        &self.taskifs
    }

    /// Allies the consumer's intermediate slot with the producer's, so the
    /// buffer the producer's task allocates is the one the consumer reads.
    ///
    /// Must run before the slots are bound; allying two already-bound slots
    /// fails with a binding conflict.
    pub fn set_inter_pair(&mut self, pair: InterPair) -> Result<(), RuntimeError> {
        if pair.out_task == pair.in_task {
            return Err(RuntimeError::InterPair {
                detail: "producer and consumer are the same task interface".into(),
            });
        }
        for index in [pair.out_task, pair.in_task] {
            if index >= self.taskifs.len() {
                return Err(RuntimeError::UnknownTaskIf { index });
            }
        }

        let out_ext =
            intermediate_slot(self.taskifs[pair.out_task].task(), pair.out_pu, PuKind::DmaOut)?;
        let in_ext =
            intermediate_slot(self.taskifs[pair.in_task].task(), pair.in_pu, PuKind::DmaIn)?;

        // The producer's slot leads the alliance; clones share its core.
        let lead = self.taskifs[pair.out_task]
            .task()
            .external_mem(out_ext)
            .map(|m| m.slot.clone())
            .ok_or_else(|| RuntimeError::InterPair {
                detail: format!("slot {out_ext} does not exist"),
            })?;
        self.taskifs[pair.in_task].ally_slot(in_ext, &lead)?;
        tracing::info!(
            kernel = %self.name,
            out_task = pair.out_task,
            out_pu = %pair.out_pu,
            in_task = pair.in_task,
            in_pu = %pair.in_pu,
            "inter-task pair allied"
        );
        Ok(())
    }

    /// Brings every task interface up: open, configure, bind intermediates,
    /// start streaming, in registration order.
    ///
    /// Stops at the first failure; interfaces already brought up stay up
    /// until [`Kernel::teardown`].
    pub fn setup_driver(&mut self, allocator: &dyn DeviceAllocator) -> Result<(), RuntimeError> {
        let _device = device_gate();
        for taskif in &mut self.taskifs {
            taskif.open()?;
            taskif.configure()?;
            taskif.alloc_inter_subchain_buf(allocator)?;
            taskif.stream_on()?;
        }
        tracing::info!(kernel = %self.name, tasks = self.taskifs.len(), "driver set up");
        Ok(())
    }

    /// Queues a parameter rewrite on one task interface; written to the
    /// device when the next invocation starts.
    pub fn stage_param(
        &mut self,
        task: usize,
        updatable: UpdatableId,
        bytes: &[u8],
    ) -> Result<(), RuntimeError> {
        let taskif = self
            .taskifs
            .get_mut(task)
            .ok_or(RuntimeError::UnknownTaskIf { index: task })?;
        taskif.stage_param(updatable, bytes)
    }

    /// Runs one frame through the whole kernel.
    ///
    /// Pre-process writes staged parameters, then each task interface puts
    /// and gets its frame in registration order with no overlap, so a task
    /// reading an allied slot sees its producer's finished output.
    pub fn kernel_function(
        &mut self,
        invocation: &Invocation,
    ) -> Result<Vec<FrameResult>, RuntimeError> {
        let _device = device_gate();
        if invocation.buffers.len() != self.taskifs.len() {
            return Err(RuntimeError::InvocationShape {
                expected: self.taskifs.len(),
                given: invocation.buffers.len(),
            });
        }
        for taskif in &mut self.taskifs {
            taskif.apply_staged()?;
        }
        let mut results = Vec::with_capacity(self.taskifs.len());
        for (taskif, buffers) in self.taskifs.iter_mut().zip(&invocation.buffers) {
            taskif.put_buffers(invocation.frame_id, &buffers.io_in, &buffers.io_out)?;
            results.push(taskif.get_buffers()?);
        }
        tracing::debug!(
            kernel = %self.name,
            frame = invocation.frame_id,
            tasks = results.len(),
            "invocation complete"
        );
        Ok(results)
    }

    /// Closes every task interface, keeping going past failures; the first
    /// error is reported once all interfaces are down.
    pub fn teardown(&mut self) -> Result<(), RuntimeError> {
        let _device = device_gate();
        let mut first: Option<RuntimeError> = None;
        for taskif in &mut self.taskifs {
            if let Err(e) = taskif.close() {
                tracing::warn!(
                    kernel = %self.name,
                    task = taskif.task().id(),
                    error = %e,
                    "teardown error, continuing"
                );
                first.get_or_insert(e);
            }
        }
        tracing::info!(kernel = %self.name, "torn down");
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn intermediate_slot(
    task: &Task<Resolved>,
    pu: PuId,
    wanted: PuKind,
) -> Result<ExtMemId, RuntimeError> {
    let fail = |detail: String| RuntimeError::InterPair { detail };
    let p = task
        .pu(pu)
        .ok_or_else(|| fail(format!("{pu} does not exist")))?;
    if p.kind() != wanted {
        return Err(fail(format!("{pu} is {}, expected {wanted}", p.kind())));
    }
    let mm = p
        .memmap()
        .ok_or_else(|| fail(format!("{pu} has no memmap")))?;
    let ext = task
        .memmap(mm)
        .and_then(|m| m.ext_mem())
        .ok_or_else(|| fail(format!("{pu} is preload-backed")))?;
    if task.external_mem(ext).is_some_and(|e| e.is_io()) {
        return Err(fail(format!(
            "slot {ext} is an I/O boundary, not an intermediate"
        )));
    }
    Ok(ext)
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{BufferDesc, SimNode};
    use device_mem::{DeviceBudget, HostAllocator};
    use task_ir::{ExternalMem, ImageDesc, MemmapBacking, PuParams, VertexKind};

    use crate::taskif::IfState;

    fn buf(fd: i32) -> BufferDesc {
        BufferDesc {
            fd,
            len: 4096,
            roi: None,
        }
    }

    fn host_alloc() -> HostAllocator {
        HostAllocator::new(DeviceBudget::from_mb(1))
    }

    /// DmaIn -> Salb -> DmaOut over 64x64 gray. `out_io` picks whether the
    /// output slot is an I/O boundary or an intermediate; `in_io` likewise
    /// for the input.
    fn linear_task(id: u16, in_io: bool, out_io: bool) -> Task<Resolved> {
        let mut t = Task::new(id, 0);
        let start = t.add_vertex(VertexKind::Start).unwrap();
        let process = t.add_vertex(VertexKind::Process).unwrap();
        let end = t.add_vertex(VertexKind::End).unwrap();
        t.add_edge(start, process).unwrap();
        t.add_edge(process, end).unwrap();
        let sc = t.add_hw_subchain(process).unwrap();

        let in_mem = t
            .add_external_mem(if in_io {
                ExternalMem::io()
            } else {
                ExternalMem::intermediate()
            })
            .unwrap();
        let out_mem = t
            .add_external_mem(if out_io {
                ExternalMem::io()
            } else {
                ExternalMem::intermediate()
            })
            .unwrap();
        let in_map = t
            .add_memmap(MemmapBacking::External(in_mem), ImageDesc::new(64, 64, 1))
            .unwrap();
        let out_map = t
            .add_memmap(
                MemmapBacking::External(out_mem),
                ImageDesc {
                    width: 0,
                    height: 0,
                    pixel_bytes: 1,
                    line_ofs: 0,
                },
            )
            .unwrap();

        let root = t.sizes_mut().add_inout(None).unwrap();
        let mid = t.sizes_mut().add_inout(Some(root)).unwrap();
        let dma_in = t
            .add_pu(sc, PuKind::DmaIn, 0, PuParams::default_for(PuKind::DmaIn), Some(root))
            .unwrap();
        let salb = t
            .add_pu(sc, PuKind::Salb, 0, PuParams::default_for(PuKind::Salb), Some(mid))
            .unwrap();
        let dma_out = t
            .add_pu(sc, PuKind::DmaOut, 0, PuParams::default_for(PuKind::DmaOut), Some(mid))
            .unwrap();
        t.set_memmap(dma_in, in_map).unwrap();
        t.set_memmap(dma_out, out_map).unwrap();
        t.connect(dma_in, 0, salb, 0).unwrap();
        t.connect(salb, 0, dma_out, 0).unwrap();
        t.resolve_sizes().unwrap()
    }

    fn sim_if(task: Task<Resolved>) -> TaskIf {
        TaskIf::new(task, Box::new(SimNode::new(4)))
    }

    #[test]
    fn test_setup_invoke_teardown() {
        let alloc = host_alloc();
        let mut kernel = Kernel::new("pair");
        kernel.add_taskif(sim_if(linear_task(1, true, true)));
        kernel.add_taskif(sim_if(linear_task(2, true, true)));
        kernel.setup_driver(&alloc).unwrap();
        assert!(kernel
            .taskifs()
            .iter()
            .all(|t| t.state() == IfState::Streaming));

        let invocation = Invocation {
            frame_id: 5,
            buffers: vec![
                TaskBuffers {
                    io_in: vec![buf(10)],
                    io_out: vec![buf(11)],
                },
                TaskBuffers {
                    io_in: vec![buf(12)],
                    io_out: vec![buf(13)],
                },
            ],
        };
        let results = kernel.kernel_function(&invocation).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.frame_id == 5));

        kernel.teardown().unwrap();
        assert!(kernel
            .taskifs()
            .iter()
            .all(|t| t.state() == IfState::Closed));
    }

    #[test]
    fn test_invocation_shape_checked() {
        let alloc = host_alloc();
        let mut kernel = Kernel::new("solo");
        kernel.add_taskif(sim_if(linear_task(1, true, true)));
        kernel.setup_driver(&alloc).unwrap();
        let invocation = Invocation {
            frame_id: 0,
            buffers: Vec::new(),
        };
        assert!(matches!(
            kernel.kernel_function(&invocation),
            Err(RuntimeError::InvocationShape {
                expected: 1,
                given: 0
            })
        ));
    }

    #[test]
    fn test_inter_pair_shares_one_buffer() {
        let alloc = host_alloc();
        let mut kernel = Kernel::new("chain");
        // Producer writes an intermediate slot, consumer reads one.
        kernel.add_taskif(sim_if(linear_task(1, true, false)));
        kernel.add_taskif(sim_if(linear_task(2, false, true)));
        kernel
            .set_inter_pair(InterPair {
                out_task: 0,
                out_pu: PuId(2),
                in_task: 1,
                in_pu: PuId(0),
            })
            .unwrap();
        kernel.setup_driver(&alloc).unwrap();

        // One allocation covers both sides of the alliance.
        assert_eq!(alloc.stats().total_allocations, 1);
        let producer_binding = kernel
            .taskif(0)
            .unwrap()
            .task()
            .external_mem(ExtMemId(1))
            .unwrap()
            .slot
            .binding();
        let consumer_binding = kernel
            .taskif(1)
            .unwrap()
            .task()
            .external_mem(ExtMemId(0))
            .unwrap()
            .slot
            .binding();
        assert!(producer_binding.is_some());
        assert_eq!(producer_binding, consumer_binding);

        let invocation = Invocation {
            frame_id: 0,
            buffers: vec![
                TaskBuffers {
                    io_in: vec![buf(10)],
                    io_out: Vec::new(),
                },
                TaskBuffers {
                    io_in: Vec::new(),
                    io_out: vec![buf(11)],
                },
            ],
        };
        let results = kernel.kernel_function(&invocation).unwrap();
        assert_eq!(results.len(), 2);
        kernel.teardown().unwrap();
    }

    #[test]
    fn test_inter_pair_validation() {
        let mut kernel = Kernel::new("bad");
        kernel.add_taskif(sim_if(linear_task(1, true, true)));
        kernel.add_taskif(sim_if(linear_task(2, true, true)));

        assert!(matches!(
            kernel.set_inter_pair(InterPair {
                out_task: 0,
                out_pu: PuId(2),
                in_task: 0,
                in_pu: PuId(0),
            }),
            Err(RuntimeError::InterPair { .. })
        ));
        assert!(matches!(
            kernel.set_inter_pair(InterPair {
                out_task: 0,
                out_pu: PuId(2),
                in_task: 5,
                in_pu: PuId(0),
            }),
            Err(RuntimeError::UnknownTaskIf { index: 5 })
        ));
        // Both endpoint slots are I/O boundaries here.
        assert!(matches!(
            kernel.set_inter_pair(InterPair {
                out_task: 0,
                out_pu: PuId(2),
                in_task: 1,
                in_pu: PuId(0),
            }),
            Err(RuntimeError::InterPair { .. })
        ));
        // The named producer must be a DMA-out unit.
        assert!(matches!(
            kernel.set_inter_pair(InterPair {
                out_task: 0,
                out_pu: PuId(1),
                in_task: 1,
                in_pu: PuId(0),
            }),
            Err(RuntimeError::InterPair { .. })
        ));
    }

    #[test]
    fn test_teardown_reports_first_error_but_closes_all() {
        let alloc = host_alloc();
        let mut kernel = Kernel::new("late");
        kernel.add_taskif(sim_if(linear_task(1, true, true)));
        kernel.add_taskif(sim_if(linear_task(2, true, true)));
        kernel.setup_driver(&alloc).unwrap();

        // Leave a frame in flight on the second interface.
        kernel
            .taskif_mut(1)
            .unwrap()
            .put_buffers(9, &[buf(1)], &[buf(2)])
            .unwrap();

        assert!(matches!(
            kernel.teardown(),
            Err(RuntimeError::PendingFrames { frames: 1 })
        ));
        assert!(kernel
            .taskifs()
            .iter()
            .all(|t| t.state() == IfState::Closed));
    }

    #[test]
    fn test_stage_param_checks_index() {
        let mut kernel = Kernel::new("params");
        kernel.add_taskif(sim_if(linear_task(1, true, true)));
        assert!(matches!(
            kernel.stage_param(3, UpdatableId(0), &[0u8; 4]),
            Err(RuntimeError::UnknownTaskIf { index: 3 })
        ));
    }
}
