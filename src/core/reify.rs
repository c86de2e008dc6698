//! Reification helpers (spec §9 "Conditional reification").
//!
//! The source relies on CP-SAT's native `OnlyEnforceIf`. With a MILP back
//! end these become big-M inequalities; since every boolean variable here
//! has domain `{0,1}`, the AND-of-two-booleans pattern needs no M at all
//! (spec §9: "where only MILP is available, express as big-M inequalities
//! with M=1 (variables are boolean)").

use good_lp::{constraint, Constraint, Expression, ProblemVariables, Variable, variable};

/// Creates a fresh binary variable `b` with `b == on AND NOT off`, i.e. the
/// standard AND-of-(x, not y) reification used for "leaving segment",
/// "starting occupation", and "completing journey" in spec §4.2/§4.3.
pub fn reify_and_not(
    vars: &mut ProblemVariables,
    constraints: &mut Vec<Constraint>,
    on: Variable,
    off: Variable,
) -> Variable {
    let b = vars.add(variable().binary());
    constraints.push(constraint!(b <= on));
    constraints.push(constraint!(b <= 1 - off));
    constraints.push(constraint!(b >= on - off));
    b
}

/// Like [`reify_and_not`] but with no "off" clause — used at τ=0, where
/// there is no prior tick to test (spec §4.3, §9(b)): `b == on`.
pub fn reify_from(
    vars: &mut ProblemVariables,
    constraints: &mut Vec<Constraint>,
    on: Variable,
) -> Variable {
    let b = vars.add(variable().binary());
    constraints.push(constraint!(b <= on));
    constraints.push(constraint!(b >= on));
    b
}

/// `trigger == 1 => expr <= bound`, big-M relaxed to a no-op when trigger is 0.
pub fn implies_le(trigger: Variable, expr: Expression, bound: f64, big_m: f64) -> Constraint {
    constraint!(expr <= bound + big_m * (1 - trigger))
}

/// `trigger == 1 => expr >= bound`, big-M relaxed to a no-op when trigger is 0.
pub fn implies_ge(trigger: Variable, expr: Expression, bound: f64, big_m: f64) -> Constraint {
    constraint!(expr >= bound - big_m * (1 - trigger))
}

/// `all(triggers) == 1 => expr >= bound`, relaxed by M per trigger that is 0.
pub fn implies_ge_all(
    triggers: &[Variable],
    expr: Expression,
    bound: f64,
    big_m: f64,
) -> Constraint {
    let slack = triggers
        .iter()
        .fold(Expression::from(0.0), |acc, t| acc + (1 - *t));
    constraint!(expr >= bound - big_m * slack)
}

/// Creates a fresh binary variable `b` with `b == on AND other` (no negation
/// on the second term, unlike [`reify_and_not`]) — used for "both trains
/// present" style joint conditions.
pub fn reify_and(
    vars: &mut ProblemVariables,
    constraints: &mut Vec<Constraint>,
    a: Variable,
    b_var: Variable,
) -> Variable {
    let b = vars.add(variable().binary());
    constraints.push(constraint!(b <= a));
    constraints.push(constraint!(b <= b_var));
    constraints.push(constraint!(b >= a + b_var - 1));
    b
}

/// Creates a fresh binary variable `b` with `b == OR(terms)`.
pub fn reify_or(
    vars: &mut ProblemVariables,
    constraints: &mut Vec<Constraint>,
    terms: &[Variable],
) -> Variable {
    let b = vars.add(variable().binary());
    let sum_expr = sum(terms.iter().copied());
    for t in terms {
        constraints.push(constraint!(b >= *t));
    }
    constraints.push(constraint!(b <= sum_expr));
    b
}

/// Forces two bounded integer variables to differ whenever every trigger in
/// `gates` is 1 (ungated when `gates` is empty), via a fresh binary
/// disjunction switch (used for platform uniqueness, spec §4.2 C4: two
/// trains present on the same station at the same tick must hold different
/// platform numbers).
pub fn reify_not_equal(
    vars: &mut ProblemVariables,
    constraints: &mut Vec<Constraint>,
    gates: &[Variable],
    a: Variable,
    b: Variable,
    domain_width: f64,
) {
    let switch = vars.add(variable().binary());
    let mut triggers: Vec<Variable> = gates.to_vec();
    triggers.push(switch);
    constraints.push(implies_ge_all(&triggers, Expression::from(a) - b, 1.0, domain_width));

    let not_switch = vars.add(variable().binary());
    constraints.push(constraint!(not_switch == 1 - switch));
    triggers.pop();
    triggers.push(not_switch);
    constraints.push(implies_ge_all(&triggers, Expression::from(b) - a, 1.0, domain_width));
}

pub fn sum(vars: impl IntoIterator<Item = Variable>) -> Expression {
    vars.into_iter()
        .fold(Expression::from(0.0), |acc, v| acc + v)
}
