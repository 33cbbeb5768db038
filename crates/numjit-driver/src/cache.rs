//! The specialization cache.
//!
//! One compiled function per `(name, argument types)` key. A key is
//! compiled at most once: concurrent requests for the same key wait for
//! the thread compiling it and share its result, failures included.
//! Requests for different keys compile in parallel.
//!
//! The cache is also the [`FunctionResolver`] handed to inference, so a
//! call to another registered function compiles that callee on demand.
//! A callee that fails to compile falls back to the host call protocol.
//! So does a callee whose compilation is waiting, directly or through
//! other threads, on the function being compiled: the cache tracks which
//! thread owns each in-flight key and which key each thread waits on, and
//! refuses any wait that would close a cycle.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use numjit_ast::FunctionDef;
use numjit_common::Span;
use numjit_typeck::{
    CallResolution, FunctionResolver, Namespace, Signature, TypeError, TypeckOptions,
};
use numjit_types::Type;

use crate::pipeline::{compile_function, join, CompiledFunction};

type CacheKey = (String, Vec<Type>);
type CacheEntry = Result<Arc<CompiledFunction>, TypeError>;

enum Slot {
    /// Being compiled by the given thread.
    InFlight(ThreadId),
    Done(CacheEntry),
}

#[derive(Default)]
struct CacheState {
    slots: FxHashMap<CacheKey, Slot>,
    /// The key each blocked thread is waiting for.
    waiting: FxHashMap<ThreadId, CacheKey>,
    compiles: usize,
}

impl CacheState {
    /// Whether `owner` is, through a chain of waits, blocked on `me`.
    fn waits_on(&self, owner: ThreadId, me: ThreadId) -> bool {
        let mut thread = owner;
        for _ in 0..=self.waiting.len() {
            if thread == me {
                return true;
            }
            let Some(key) = self.waiting.get(&thread) else {
                return false;
            };
            match self.slots.get(key) {
                Some(Slot::InFlight(next)) => thread = *next,
                _ => return false,
            }
        }
        false
    }
}

/// What a request for a key found.
enum Claim {
    Ready(CacheEntry),
    /// The calling thread now owns the key and must compile it.
    Owner,
    /// Waiting would deadlock.
    Cycle,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    /// No function of that name was registered.
    UnknownFunction(String),
    Type(TypeError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownFunction(name) => write!(f, "no function named `{}`", name),
            CompileError::Type(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<TypeError> for CompileError {
    fn from(err: TypeError) -> Self {
        CompileError::Type(err)
    }
}

pub struct FunctionCache {
    sources: RwLock<FxHashMap<String, Arc<FunctionDef>>>,
    state: Mutex<CacheState>,
    /// Signalled whenever an in-flight slot is resolved or discarded.
    settled: Condvar,
    /// Names already warned about on redefinition.
    redefined: Mutex<FxHashSet<String>>,
    namespace: Box<dyn Namespace + Send + Sync>,
    options: TypeckOptions,
}

impl FunctionCache {
    pub fn new(namespace: impl Namespace + Send + Sync + 'static, options: TypeckOptions) -> Self {
        FunctionCache {
            sources: RwLock::new(FxHashMap::default()),
            state: Mutex::new(CacheState::default()),
            settled: Condvar::new(),
            redefined: Mutex::new(FxHashSet::default()),
            namespace: Box::new(namespace),
            options,
        }
    }

    /// Make `func` compilable under its name. Registering a name again
    /// replaces the source and discards every specialization of the old
    /// one; functions already compiled against it are not revisited.
    pub fn register(&self, func: FunctionDef) {
        let name = func.name.clone();
        let previous = self.sources.write().insert(name.clone(), Arc::new(func));
        if previous.is_none() {
            return;
        }

        let mut state = self.state.lock();
        let before = state.slots.len();
        state.slots.retain(|(key_name, _), _| *key_name != name);
        let discarded = before - state.slots.len();
        drop(state);
        // Threads waiting on a discarded in-flight slot claim it afresh.
        self.settled.notify_all();

        if self.redefined.lock().insert(name.clone()) {
            log::warn!(
                "[cache] `{}` redefined; discarding {} compiled specialization(s)",
                name,
                discarded
            );
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.sources.read().contains_key(name)
    }

    /// The specialization of `name` for `args`, compiling it on first use.
    pub fn compile(&self, name: &str, args: &[Type]) -> Result<Arc<CompiledFunction>, CompileError> {
        if !self.is_registered(name) {
            return Err(CompileError::UnknownFunction(name.to_string()));
        }
        match self.compile_in(name, args) {
            Some(entry) => Ok(entry?),
            // The calling thread owns nothing it could be waiting on itself
            // unless it is inside a compilation of its own.
            None => Err(CompileError::Type(TypeError::internal(
                format!("compiling `{}` from inside its own compilation", name),
                Span::synthetic(),
            ))),
        }
    }

    /// Compile `name` for a signature with a declared return type. The
    /// result is not cached; callees still go through the cache.
    pub fn compile_declared(
        &self,
        name: &str,
        signature: &Signature,
    ) -> Result<CompiledFunction, CompileError> {
        let source = self
            .source(name)
            .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;
        self.state.lock().compiles += 1;
        Ok(compile_function(
            (*source).clone(),
            signature,
            self.namespace.as_ref(),
            &CacheResolver { cache: self },
            &self.options,
        )?)
    }

    /// How many pipelines this cache has run.
    pub fn compile_count(&self) -> usize {
        self.state.lock().compiles
    }

    fn source(&self, name: &str) -> Option<Arc<FunctionDef>> {
        self.sources.read().get(name).cloned()
    }

    /// The cached entry for the key, compiling it on this thread if no one
    /// else is. `None` when the key can only finish after this thread does.
    fn compile_in(&self, name: &str, args: &[Type]) -> Option<CacheEntry> {
        let key: CacheKey = (name.to_string(), args.to_vec());
        match self.claim(&key) {
            Claim::Ready(entry) => return Some(entry),
            Claim::Cycle => return None,
            Claim::Owner => {}
        }

        let guard = InFlight { cache: self, key };
        log::debug!("[cache] miss for `{}` ({})", name, join(args));
        let entry = match self.source(name) {
            Some(source) => compile_function(
                (*source).clone(),
                &Signature::new(args.to_vec(), None),
                self.namespace.as_ref(),
                &CacheResolver { cache: self },
                &self.options,
            )
            .map(Arc::new),
            None => Err(TypeError::internal(
                format!("`{}` was unregistered during compilation", name),
                Span::synthetic(),
            )),
        };
        guard.finish(entry.clone());
        Some(entry)
    }

    fn claim(&self, key: &CacheKey) -> Claim {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            let owner = match state.slots.get(key) {
                Some(Slot::Done(entry)) => {
                    let entry = entry.clone();
                    state.waiting.remove(&me);
                    return Claim::Ready(entry);
                }
                Some(Slot::InFlight(owner)) => *owner,
                None => {
                    state.waiting.remove(&me);
                    state.slots.insert(key.clone(), Slot::InFlight(me));
                    state.compiles += 1;
                    return Claim::Owner;
                }
            };
            if state.waits_on(owner, me) {
                state.waiting.remove(&me);
                return Claim::Cycle;
            }
            state.waiting.insert(me, key.clone());
            self.settled.wait(&mut state);
        }
    }
}

/// Ownership of an in-flight slot. Dropping it without `finish` (a panic
/// in a pass) frees the slot so waiters can claim it.
struct InFlight<'a> {
    cache: &'a FunctionCache,
    key: CacheKey,
}

impl InFlight<'_> {
    fn finish(self, entry: CacheEntry) {
        let me = thread::current().id();
        let mut state = self.cache.state.lock();
        // A redefinition may have discarded the slot meanwhile.
        if matches!(state.slots.get(&self.key), Some(Slot::InFlight(owner)) if *owner == me) {
            state.slots.insert(self.key.clone(), Slot::Done(entry));
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let me = thread::current().id();
        let mut state = self.cache.state.lock();
        if matches!(state.slots.get(&self.key), Some(Slot::InFlight(owner)) if *owner == me) {
            state.slots.remove(&self.key);
        }
        drop(state);
        self.cache.settled.notify_all();
    }
}

/// Resolves calls made by the function being compiled.
struct CacheResolver<'a> {
    cache: &'a FunctionCache,
}

impl FunctionResolver for CacheResolver<'_> {
    fn resolve_or_compile(&self, callee: &str, arg_types: &[Type]) -> CallResolution {
        if !self.cache.is_registered(callee) {
            return CallResolution::Fallback;
        }

        match self.cache.compile_in(callee, arg_types) {
            Some(Ok(compiled)) => CallResolution::Native(compiled.entry_point()),
            Some(Err(err)) => {
                log::warn!(
                    "[cache] cannot compile `{}` for ({}), calling it through the host: {}",
                    callee,
                    join(arg_types),
                    err
                );
                CallResolution::Fallback
            }
            None => {
                log::debug!(
                    "[cache] recursive call to `{}` ({}) goes through the host",
                    callee,
                    join(arg_types)
                );
                CallResolution::Fallback
            }
        }
    }
}
