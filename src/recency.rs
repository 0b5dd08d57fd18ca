use std::collections::VecDeque;

use crate::platform::Hwnd;


# [ derive (Debug, Default, Clone) ]
/// Most-recently-hidden-first sequence of handles, spanning both hiding mechanisms.
/// A handle is present at most once .. re-recording it moves it to the front.
pub struct RecencyList {
    hwnds : VecDeque<Hwnd>,
}

impl RecencyList {

    pub fn new () -> RecencyList { RecencyList::default() }

    pub fn record_hidden (&mut self, hwnd:Hwnd) {
        self.record_restored (hwnd);
        self.hwnds.push_front (hwnd);
    }

    pub fn record_restored (&mut self, hwnd:Hwnd) {
        self.hwnds.retain (|&h| h != hwnd);
    }

    pub fn pop_front  (&mut self) -> Option<Hwnd> { self.hwnds.pop_front() }
    pub fn push_front (&mut self, hwnd:Hwnd) { self.record_hidden (hwnd) }

    pub fn len      (&self) -> usize { self.hwnds.len() }
    pub fn is_empty (&self) -> bool  { self.hwnds.is_empty() }
    pub fn clear    (&mut self) { self.hwnds.clear() }

    pub fn contains (&self, hwnd:Hwnd) -> bool { self.hwnds.contains(&hwnd) }

    pub fn retain (&mut self, keep: impl Fn(Hwnd) -> bool) { self.hwnds.retain (|&h| keep(h)) }

    pub fn iter (&self) -> impl Iterator<Item = Hwnd> + '_ { self.hwnds.iter().copied() }
    pub fn to_vec (&self) -> Vec<Hwnd> { self.iter().collect() }

}
