//! Splits collections into bounded batches for statement-limited bulk writes.

/// Maximum number of items in one batch.
pub const BATCH_SIZE: usize = 2048;

/// A value paired with the integer key it was grouped under
/// (usually a session or user id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container<T> {
    pub value: T,
    pub id: i64,
}

impl<T> Container<T> {
    pub fn new(value: T, id: i64) -> Self {
        Self { value, id }
    }
}

/// Split `objects` into batches of at most [`BATCH_SIZE`], keeping input order.
///
/// Empty input yields no batches; only the last batch may be short.
pub fn split_into_batches<T, I>(objects: I) -> Vec<Vec<T>>
where
    I: IntoIterator<Item = T>,
{
    split_with_size(objects, BATCH_SIZE)
}

/// Flatten keyed groups into batches of [`Container`]s, at most
/// [`BATCH_SIZE`] each. Items are visited in outer key order, then inner
/// list order, and each keeps the key it was grouped under.
pub fn split_into_batches_id<T, V, I>(objects: I) -> Vec<Vec<Container<T>>>
where
    I: IntoIterator<Item = (i64, V)>,
    V: IntoIterator<Item = T>,
{
    split_with_size(
        objects.into_iter().flat_map(|(id, values)| {
            values.into_iter().map(move |value| Container::new(value, id))
        }),
        BATCH_SIZE,
    )
}

pub(crate) fn split_with_size<T, I>(objects: I, size: usize) -> Vec<Vec<T>>
where
    I: IntoIterator<Item = T>,
{
    debug_assert!(size > 0, "batch size must be positive");
    let mut batches: Vec<Vec<T>> = Vec::new();
    for object in objects {
        match batches.last_mut() {
            Some(current) if current.len() < size => current.push(object),
            _ => {
                let mut next = Vec::with_capacity(size);
                next.push(object);
                batches.push(next);
            }
        }
    }
    batches
}
