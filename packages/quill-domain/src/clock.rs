use time::OffsetDateTime;

/// Time source shared by every component that stamps or expires state.
pub trait Clock
where
	Self: Send + Sync,
{
	fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}
