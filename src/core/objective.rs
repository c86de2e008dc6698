//! Objective Assembler (spec §4.4).
//!
//! Grounded on `original_source/opt-engine/src/optimizer.py`
//! (`_set_objective`): delay weighted by priority, journey length,
//! conflict penalty, and a small total-disruption term.

use good_lp::Expression;

use super::arena::VariableArena;
use crate::models::input::ValidatedModel;

pub fn build(model: &ValidatedModel, arena: &VariableArena) -> Expression {
    let w_d = model.config.delay_weight;
    let w_c = model.config.conflict_weight;
    let m_p = model.config.priority_multiplier;

    let mut objective = Expression::from(0.0);

    for train in &model.trains {
        let Some(tix) = arena.train_ix(&train.train_id) else {
            continue;
        };
        let priority_factor = (6.0 - train.priority as f64) * m_p;
        objective += w_d * priority_factor * arena.delay(tix);
        objective += w_d * 0.1 * arena.completion(tix);
        objective += w_d * 0.01 * arena.delay(tix);
    }

    for conflict in &model.conflicts {
        let Some(qix) = arena.conflict_ix(&conflict.conflict_id) else {
            continue;
        };
        let severity_factor = (6.0 - conflict.severity as f64) * w_c;
        objective += severity_factor * arena.conflict(qix);
    }

    objective
}
