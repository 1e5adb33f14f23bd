use std::collections::VecDeque;

use crate::{
    context::LedgerContext,
    model::{Money, Person, Settlement},
};

#[derive(Clone, Copy, Debug)]
struct Position<'p> {
    name: &'p str,
    balance: Money,
}

/// Greedy settlement planning: the largest debtor pays the largest creditor
/// until one side runs out.
///
/// Creditors owed more than the context tolerance and debtors owing more than
/// it take part; anyone within one tolerance of zero is left alone. Emits at
/// most `n - 1` transfers for `n` such people. This is not guaranteed to be the global minimum number of transfers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SettlementPlanner {
    context: LedgerContext,
}

impl SettlementPlanner {
    pub const fn new(context: LedgerContext) -> Self {
        Self { context }
    }

    pub fn plan(&self, people: &[Person]) -> Vec<Settlement> {
        let tolerance = self.context.tolerance;

        // Only balances strictly beyond the tolerance take part.
        let mut creditors: Vec<Position<'_>> = people
            .iter()
            .filter(|person| person.balance > tolerance)
            .map(Position::from)
            .collect();
        // Stable sorts keep first-seen order among equal balances.
        creditors.sort_by(|a, b| b.balance.cmp(&a.balance));

        let mut debtors: Vec<Position<'_>> = people
            .iter()
            .filter(|person| person.balance < -tolerance)
            .map(Position::from)
            .collect();
        debtors.sort_by(|a, b| a.balance.cmp(&b.balance));

        let mut creditors = VecDeque::from(creditors);
        let mut debtors = VecDeque::from(debtors);
        let mut settlements = Vec::with_capacity(creditors.len() + debtors.len());

        loop {
            let (Some(creditor), Some(debtor)) = (creditors.front_mut(), debtors.front_mut())
            else {
                break;
            };
            let transfer = creditor.balance.min(debtor.balance.abs());
            settlements.push(Settlement {
                from: debtor.name.to_owned(),
                to: creditor.name.to_owned(),
                amount: self.context.round(transfer),
            });

            creditor.balance -= transfer;
            debtor.balance += transfer;

            let creditor_settled = is_settled(creditor.balance, tolerance);
            let debtor_settled = is_settled(debtor.balance, tolerance);
            if creditor_settled {
                creditors.pop_front();
            }
            if debtor_settled {
                debtors.pop_front();
            }
        }

        let residue: Money = creditors
            .iter()
            .chain(debtors.iter())
            .map(|position| position.balance)
            .sum();
        if !residue.is_zero() {
            tracing::debug!(residue = %residue, "Leaving settlement residue unplanned");
        }

        settlements
    }
}

impl<'p> From<&'p Person> for Position<'p> {
    fn from(person: &'p Person) -> Self {
        Self {
            name: &person.name,
            balance: person.balance,
        }
    }
}

fn is_settled(balance: Money, tolerance: Money) -> bool {
    balance.is_zero() || balance.abs() < tolerance
}
