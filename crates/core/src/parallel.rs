//! Data-parallel helpers honouring the model's `parallel` switch
//!
//! Every per-cell and per-face loop of the engine goes through these helpers so
//! the same closure runs either on the rayon pool or sequentially.

use rayon::prelude::*;

/// Apply `f` to every item with its index
pub(crate) fn for_each_mut<T, F>(items: &mut [T], parallel: bool, f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    if parallel {
        items.par_iter_mut().enumerate().for_each(|(i, item)| f(i, item));
    } else {
        items.iter_mut().enumerate().for_each(|(i, item)| f(i, item));
    }
}

/// Mutate every item with its index and collect the closure results in order
pub(crate) fn map_mut<T, R, F>(items: &mut [T], parallel: bool, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(usize, &mut T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter_mut().enumerate().map(|(i, item)| f(i, item)).collect()
    } else {
        items.iter_mut().enumerate().map(|(i, item)| f(i, item)).collect()
    }
}

/// Map every item with its index and collect the results in order
pub(crate) fn map_indexed<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().enumerate().map(|(i, item)| f(i, item)).collect()
    } else {
        items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
    }
}
