//! The real-time playback engine: renders all playheads in the audio callback.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    bounds::DimensionBounds,
    corpus::{Corpus, CorpusPoint},
    picker::JumpTargetSelector,
    playhead::{Playhead, PlayheadId, VisualPlayhead},
    settings::{PlaybackSettings, MAX_JUMP_TARGETS},
    spatial::SpatialIndex,
    utils::{
        buffer::{add_buffers, clear_buffer, fade_out_buffer, scale_buffer},
        permit_alloc,
    },
};

mod render;
use render::{render_playhead, DynamicPan, PlayheadState, RenderContext};

// -------------------------------------------------------------------------------------------------

/// Number of interleaved output channels the engine renders.
pub const CHANNEL_COUNT: usize = 2;

/// Maximum number of playhead creation requests which may wait for the render thread.
pub const MAX_PENDING_PLAYHEADS: usize = 3;

const PLAYHEAD_CAPACITY: usize = 64;

// -------------------------------------------------------------------------------------------------

/// State owned by the render thread. The control thread only locks it to swap corpora or to
/// tear everything down, while the render thread only ever tries to lock it.
struct RenderState {
    corpus: Option<Arc<Corpus>>,
    /// Last seen dimension bounds, used while the shared bounds are locked.
    bounds: DimensionBounds,
    playheads: Vec<Playhead>,
    kills: Vec<PlayheadId>,
    scratch: Vec<f32>,
    selector: JumpTargetSelector,
    rng: SmallRng,
}

/// Playhead commands from the control thread. Drained by the render thread.
#[derive(Default)]
struct CommandQueue {
    new_playheads: VecDeque<Playhead>,
    kills: VecDeque<PlayheadId>,
    next_id: PlayheadId,
}

struct EngineShared {
    render: Mutex<RenderState>,
    commands: Mutex<CommandQueue>,
    visual: Mutex<Vec<VisualPlayhead>>,
    corpus: Mutex<Option<Arc<Corpus>>>,
    bounds: Mutex<DimensionBounds>,
    spatial_index: Mutex<SpatialIndex>,
    settings: PlaybackSettings,
    stream_running: AtomicBool,
    user_paused: AtomicBool,
    restarting: AtomicBool,
    missing_output: AtomicBool,
    block_request: AtomicU64,
    block_ack: AtomicU64,
    active_playheads: AtomicUsize,
}

// -------------------------------------------------------------------------------------------------

/// Corpus playback engine.
///
/// A cheaply cloneable handle, shared between the control thread (via the
/// [`PlaybackController`](crate::PlaybackController)) and the audio output stream, which
/// calls [`process`](Self::process) from its real-time thread.
///
/// The render thread never blocks: all shared state is accessed via `try_lock`. When a lock
/// is not available, the affected state is treated as unchanged for this callback.
#[derive(Clone)]
pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackEngine {
    pub fn new() -> Self {
        let render = RenderState {
            corpus: None,
            bounds: DimensionBounds::default(),
            playheads: Vec::with_capacity(PLAYHEAD_CAPACITY),
            kills: Vec::with_capacity(PLAYHEAD_CAPACITY),
            scratch: Vec::new(),
            selector: JumpTargetSelector::new(MAX_JUMP_TARGETS),
            rng: SmallRng::from_os_rng(),
        };
        let commands = CommandQueue {
            new_playheads: VecDeque::with_capacity(MAX_PENDING_PLAYHEADS + 1),
            kills: VecDeque::with_capacity(PLAYHEAD_CAPACITY),
            next_id: 0,
        };
        Self {
            shared: Arc::new(EngineShared {
                render: Mutex::new(render),
                commands: Mutex::new(commands),
                visual: Mutex::new(Vec::with_capacity(PLAYHEAD_CAPACITY)),
                corpus: Mutex::new(None),
                bounds: Mutex::new(DimensionBounds::default()),
                spatial_index: Mutex::new(SpatialIndex::new()),
                settings: PlaybackSettings::default(),
                stream_running: AtomicBool::new(false),
                user_paused: AtomicBool::new(false),
                restarting: AtomicBool::new(false),
                missing_output: AtomicBool::new(false),
                block_request: AtomicU64::new(0),
                block_ack: AtomicU64::new(0),
                active_playheads: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of interleaved output channels.
    pub fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }

    /// Tunable playback parameters.
    pub fn settings(&self) -> &PlaybackSettings {
        &self.shared.settings
    }

    /// Number of live playheads, as of the last render callback.
    pub fn active_playhead_count(&self) -> usize {
        self.shared.active_playheads.load(Ordering::Relaxed)
    }

    /// Latest published playhead positions.
    pub fn visual_playheads(&self) -> Vec<VisualPlayhead> {
        lock(&self.shared.visual).clone()
    }

    /// Render the next buffer of interleaved stereo frames into `output`.
    ///
    /// Called from the audio thread: never blocks. Renders silence while the stream is
    /// restarting, the output is missing or playback is paused by the user.
    pub fn process(&self, output: &mut [f32]) {
        clear_buffer(output);
        let shared = &*self.shared;

        let blocked = self.observe_block_flags();

        let Ok(mut render) = shared.render.try_lock() else {
            return;
        };
        let render = &mut *render;

        // apply playhead commands
        if let Ok(mut commands) = shared.commands.try_lock() {
            permit_alloc(|| {
                render.playheads.extend(commands.new_playheads.drain(..));
                while let Some(id) = commands.kills.pop_front() {
                    if blocked {
                        render.playheads.retain(|playhead| playhead.id != id);
                    } else {
                        render.kills.push(id);
                    }
                }
            });
        }

        if !blocked {
            if let Some(corpus) = render.corpus.clone() {
                self.render_playheads(render, &corpus, output);
            }
        }
        render.kills.clear();

        // publish playhead positions
        if let Ok(mut visual) = shared.visual.try_lock() {
            permit_alloc(|| {
                visual.clear();
                visual.extend(render.playheads.iter().map(Playhead::visual));
            });
        }
        shared
            .active_playheads
            .store(render.playheads.len(), Ordering::Relaxed);
    }

    fn render_playheads(&self, render: &mut RenderState, corpus: &Corpus, output: &mut [f32]) {
        let shared = &*self.shared;
        let settings = &shared.settings;

        let pan_strength = settings.pan_strength();
        let dynamic_pan = settings.dynamic_pan() && pan_strength > 0.0;
        if dynamic_pan {
            if let Ok(bounds) = shared.bounds.try_lock() {
                if render.bounds != *bounds {
                    permit_alloc(|| render.bounds.clone_from(&bounds));
                }
            }
        }
        let context = RenderContext {
            corpus,
            spatial_index: &shared.spatial_index,
            loop_playheads: settings.loop_playheads(),
            jump_chance: settings.jump_chance(),
            crossfade_length: settings.crossfade_length(),
            max_jump_distance: settings.max_jump_distance(),
            max_jump_targets: settings.max_jump_targets(),
            same_file_jumps: settings.same_file_jumps(),
            same_file_min_time_diff: settings.same_file_min_time_diff(),
            dynamic_pan: dynamic_pan.then(|| DynamicPan {
                dimension: settings.dynamic_pan_dimension(),
                strength: pan_strength,
                bounds: &render.bounds,
            }),
        };

        if render.scratch.len() < output.len() {
            permit_alloc(|| render.scratch.resize(output.len(), 0.0));
        }

        let mut playhead_index = 0;
        while playhead_index < render.playheads.len() {
            let scratch = &mut render.scratch[..output.len()];
            clear_buffer(scratch);

            let playhead = &mut render.playheads[playhead_index];
            let state = render_playhead(
                playhead,
                scratch,
                &context,
                &mut render.selector,
                &mut render.rng,
            );
            let killed = render.kills.contains(&playhead.id);
            if state == PlayheadState::Finished || killed {
                fade_out_buffer(scratch, CHANNEL_COUNT);
                add_buffers(output, scratch);
                permit_alloc(|| drop(render.playheads.remove(playhead_index)));
            } else {
                add_buffers(output, scratch);
                playhead_index += 1;
            }
        }

        scale_buffer(output, settings.volume());
    }

    /// Returns true when rendering is blocked, confirming pending block requests.
    fn observe_block_flags(&self) -> bool {
        let shared = &*self.shared;
        let restarting = shared.restarting.load(Ordering::SeqCst);
        let missing_output = shared.missing_output.load(Ordering::SeqCst);
        if restarting || missing_output {
            let request = shared.block_request.load(Ordering::SeqCst);
            shared.block_ack.store(request, Ordering::SeqCst);
        }
        restarting || missing_output || shared.user_paused.load(Ordering::Relaxed)
    }
}

// -------------------------------------------------------------------------------------------------

/// Control thread interface, used by the controller.
impl PlaybackEngine {
    pub(crate) fn corpus(&self) -> Option<Arc<Corpus>> {
        lock(&self.shared.corpus).clone()
    }

    /// Swap in a new corpus together with its dimension bounds and spatial index. Kills all
    /// playheads and drops pending commands, which refer to the old corpus' files.
    ///
    /// The render thread is locked out for the whole swap, so it never sees the new corpus
    /// with the old bounds or index.
    pub(crate) fn set_corpus(
        &self,
        corpus: Option<Arc<Corpus>>,
        bounds: DimensionBounds,
        index: SpatialIndex,
    ) {
        let (old_playheads, old_index) = {
            let mut render = lock(&self.shared.render);
            render.corpus = corpus.clone();
            render.kills.clear();
            *lock(&self.shared.bounds) = bounds;
            let old_index = std::mem::replace(&mut *lock(&self.shared.spatial_index), index);
            (std::mem::take(&mut render.playheads), old_index)
        };
        drop(old_playheads);
        drop(old_index);
        {
            let mut commands = lock(&self.shared.commands);
            commands.new_playheads.clear();
            commands.kills.clear();
        }
        lock(&self.shared.visual).clear();
        self.shared.active_playheads.store(0, Ordering::Relaxed);
        *lock(&self.shared.corpus) = corpus;
    }

    pub(crate) fn pending_playhead_count(&self) -> usize {
        lock(&self.shared.commands).new_playheads.len()
    }

    /// Create a new playhead at the given point and queue it for the render thread.
    /// Returns `None` when too many creation requests are already pending.
    pub(crate) fn enqueue_playhead(&self, corpus: &Corpus, point: CorpusPoint) -> Option<PlayheadId> {
        // trigger points are calculated here, outside of the lock
        let mut playhead = Playhead::new(0, corpus, point);
        let mut commands = lock(&self.shared.commands);
        if commands.new_playheads.len() >= MAX_PENDING_PLAYHEADS {
            return None;
        }
        playhead.id = commands.next_id;
        commands.next_id += 1;
        commands.new_playheads.push_back(playhead);
        Some(commands.next_id - 1)
    }

    pub(crate) fn enqueue_kill(&self, id: PlayheadId) {
        lock(&self.shared.commands).kills.push_back(id);
    }

    /// Kill all playheads, drop all pending commands and reset ids, parameters, bounds and
    /// the spatial index. The corpus is released.
    pub(crate) fn clear(&self) {
        let old_playheads = {
            let mut render = lock(&self.shared.render);
            render.corpus = None;
            render.kills.clear();
            std::mem::take(&mut render.playheads)
        };
        drop(old_playheads);
        {
            let mut commands = lock(&self.shared.commands);
            commands.new_playheads.clear();
            commands.kills.clear();
            commands.next_id = 0;
        }
        lock(&self.shared.visual).clear();
        *lock(&self.shared.corpus) = None;
        *lock(&self.shared.bounds) = DimensionBounds::default();
        let old_index = std::mem::take(&mut *lock(&self.shared.spatial_index));
        drop(old_index);

        let shared = &*self.shared;
        shared.settings.reset();
        shared.stream_running.store(false, Ordering::SeqCst);
        shared.user_paused.store(false, Ordering::SeqCst);
        shared.restarting.store(false, Ordering::SeqCst);
        shared.missing_output.store(false, Ordering::SeqCst);
        shared.active_playheads.store(0, Ordering::Relaxed);
    }

    pub(crate) fn bounds(&self) -> DimensionBounds {
        lock(&self.shared.bounds).clone()
    }

    pub(crate) fn set_bounds(&self, bounds: DimensionBounds) {
        *lock(&self.shared.bounds) = bounds;
    }

    pub(crate) fn spatial_index(&self) -> MutexGuard<'_, SpatialIndex> {
        lock(&self.shared.spatial_index)
    }

    /// Swap in a new spatial index, returning the old one.
    pub(crate) fn replace_spatial_index(&self, index: SpatialIndex) -> SpatialIndex {
        std::mem::replace(&mut *lock(&self.shared.spatial_index), index)
    }

    pub(crate) fn is_stream_running(&self) -> bool {
        self.shared.stream_running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_stream_running(&self, running: bool) {
        self.shared.stream_running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn is_user_paused(&self) -> bool {
        self.shared.user_paused.load(Ordering::SeqCst)
    }

    pub(crate) fn set_user_paused(&self, paused: bool) {
        self.shared.user_paused.store(paused, Ordering::SeqCst);
    }

    pub(crate) fn set_restarting(&self, restarting: bool) {
        self.shared.restarting.store(restarting, Ordering::SeqCst);
    }

    pub(crate) fn is_missing_output(&self) -> bool {
        self.shared.missing_output.load(Ordering::SeqCst)
    }

    pub(crate) fn set_missing_output(&self, missing: bool) {
        self.shared.missing_output.store(missing, Ordering::SeqCst);
    }

    /// Request a confirmation from the render thread that it observed the currently set
    /// block flags. Returns the request's sequence number.
    pub(crate) fn request_block_confirmation(&self) -> u64 {
        self.shared.block_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// true when the render thread observed a block flag after the given request.
    pub(crate) fn is_block_confirmed(&self, request: u64) -> bool {
        self.shared.block_ack.load(Ordering::SeqCst) >= request
    }
}

// -------------------------------------------------------------------------------------------------

/// Lock a control thread mutex, ignoring poisoning: the render thread never panics while
/// holding a lock, and all guarded state stays consistent between statements.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// -------------------------------------------------------------------------------------------------
