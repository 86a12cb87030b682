/// A closed set of status values with a fixed transition table.
///
/// Staying in the current state is always allowed; anything else must be
/// listed in `next_states`.
pub trait Lifecycle: Copy + PartialEq + Sized + 'static {
    fn as_str(&self) -> &'static str;

    fn next_states(&self) -> &'static [Self];

    fn can_transition_to(&self, next: Self) -> bool {
        *self == next || self.next_states().contains(&next)
    }

    fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}
