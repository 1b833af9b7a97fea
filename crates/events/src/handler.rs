/// Execute an aggregate command deterministically (no IO, no async).
///
/// The canonical event-sourced lifecycle in one step:
///
/// 1. **Decide**: `aggregate.handle(command)` produces events (pure).
/// 2. **Evolve**: each event is applied via `aggregate.apply(event)`.
///
/// The aggregate is mutated in place; the decided events are returned so the
/// caller can persist them, publish them, or dispatch notifications.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: bramble_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
