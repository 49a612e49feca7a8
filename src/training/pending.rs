use crate::ai::Transition;
use crate::game::Player;

/// Each side's most recent non-terminal transition, held back until that
/// side moves again or the game ends.
///
/// At most one entry per side. An entry leaves its slot exactly once: either
/// superseded by the same side's next ply, or consumed at the terminal ply
/// where the opponent's entry receives its final reward.
#[derive(Debug, Default)]
pub struct PendingTransitions {
    slots: [Option<Transition>; 2],
}

impl PendingTransitions {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(player: Player) -> usize {
        match player {
            Player::X => 0,
            Player::O => 1,
        }
    }

    /// Park `transition` for `player`, returning the entry it supersedes.
    pub fn replace(&mut self, player: Player, transition: Transition) -> Option<Transition> {
        self.slots[Self::slot(player)].replace(transition)
    }

    pub fn take(&mut self, player: Player) -> Option<Transition> {
        self.slots[Self::slot(player)].take()
    }

    pub fn get(&self, player: Player) -> Option<&Transition> {
        self.slots[Self::slot(player)].as_ref()
    }

    /// Close the game: the mover's own parked entry unchanged, then the
    /// opponent's patched with `opponent_reward`, then the mover's terminal
    /// transition. Both slots are empty afterwards.
    pub fn settle(
        &mut self,
        mover: Player,
        terminal: Transition,
        opponent_reward: f32,
    ) -> Vec<Transition> {
        let mut settled = Vec::with_capacity(3);
        settled.extend(self.take(mover));
        settled.extend(self.take(mover.other()).map(|t| t.finish(opponent_reward)));
        settled.push(terminal);
        settled
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
