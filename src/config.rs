//! Node identity and the external configuration store boundary.
//!
//! Every node carries a small identity: the id of the master it is linked
//! to, its own id, and whether a LINK command has been accepted. The
//! identity is loaded from a durable store once at start-of-day and written
//! back only when a LINK or RESET command is accepted; the store itself
//! (EEPROM, flash page, file) lives outside this crate behind
//! [`ConfigStore`].

/// The node/master identifier pair and link state.
///
/// `linked` gates the whole protocol: until a LINK command from a master is
/// accepted, the node ignores every received frame except a link request
/// and refuses to send anything but one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct NodeContext {
    /// Id of the master this node is linked to.
    pub master_id: u8,
    /// This node's own id, assigned by the master during linking.
    pub node_id: u8,
    /// Whether a LINK command has been accepted since the last reset.
    pub linked: bool,
}

/// Durable storage for the node identity.
///
/// Called once at startup and on every accepted LINK/RESET command. The
/// store is assumed to either succeed or fail fatally; no partial-write
/// recovery is attempted here, which is why the interface is infallible.
pub trait ConfigStore {
    /// Reads the persisted identity, or a default one on first boot.
    fn load(&mut self) -> NodeContext;

    /// Persists `ctx` so it survives power loss.
    fn save(&mut self, ctx: &NodeContext);
}

/// A RAM-backed [`ConfigStore`] for host-side use and tests.
///
/// Nothing survives a restart; real nodes wrap their non-volatile storage
/// instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatileStore {
    ctx: NodeContext,
}

impl VolatileStore {
    /// Creates a store whose next [`ConfigStore::load`] returns `ctx`.
    pub const fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }

    /// The identity most recently saved (or initially provided).
    pub fn stored(&self) -> NodeContext {
        self.ctx
    }
}

impl ConfigStore for VolatileStore {
    fn load(&mut self) -> NodeContext {
        self.ctx
    }

    fn save(&mut self, ctx: &NodeContext) {
        self.ctx = *ctx;
    }
}
