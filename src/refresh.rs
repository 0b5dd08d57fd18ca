use crate::enumeration::WindowSnapshot;
use crate::control::Flag;


/// Cheap conservative equality scan between two consecutive enumerations.
/// Any difference anywhere (length, order, or one field of one window) counts as a change .. no attempt at patching.
pub fn snapshots_equivalent (prev:&[WindowSnapshot], cur:&[WindowSnapshot]) -> bool {
    prev.len() == cur.len() &&
        prev.iter() .zip (cur.iter()) .all (|(p,c)| p.same_observable_state(c))
}


# [ derive (Debug, Default) ]
/// Holds the last-presented enumeration so refresh ticks only rebuild the presentation list on actual change
pub struct RefreshTracker {
    last : Vec<WindowSnapshot>,
    primed : bool,
}

impl RefreshTracker {

    pub fn new () -> RefreshTracker { RefreshTracker::default() }

    /// Returns the new list if it should be presented, or None if nothing observable changed since the last one
    pub fn update (&mut self, cur:Vec<WindowSnapshot>) -> Option<&[WindowSnapshot]> {
        if self.primed && snapshots_equivalent (&self.last, &cur) { return None }
        self.last = cur;
        self.primed = true;
        Some (&self.last)
    }

    /// Forces the next update to be presented regardless of diff (e.g. after a front-end reload)
    pub fn invalidate (&mut self) { self.primed = false }

    pub fn last (&self) -> &[WindowSnapshot] { &self.last }

}



# [ derive (Debug, Default, Clone) ]
/// Pauses refreshes while the user has a context menu open over a list, so the rows can't shift under their selection.
/// Refreshes requested during the pause are remembered and run once the menu closes.
pub struct RefreshGate {
    paused  : Flag,
    pending : Flag,
}

impl RefreshGate {

    pub fn new () -> RefreshGate { RefreshGate::default() }

    pub fn pause (&self) { self.paused.set() }

    /// Resumes refreshing, returning whether a refresh was deferred during the pause
    pub fn resume (&self) -> bool {
        self.paused.clear();
        let was_pending = self.pending.is_set();
        self.pending.clear();
        was_pending
    }

    pub fn is_paused (&self) -> bool { self.paused.is_set() }

    /// Checks whether a refresh may run now .. if not, it's noted as pending for resume
    pub fn try_pass (&self) -> bool {
        if self.paused.is_set() { self.pending.set(); return false }
        true
    }

}
