use std::sync::{Mutex, OnceLock};

/// Owned scratch buffer: a fast bump arena for one worker at a time.
/// Borrow it as a [`Scratch`] and carve slices off the front; allocation
/// inside an operation is then pointer arithmetic, with no locking.
pub struct ScratchOwned {
    data: Vec<u64>,
}

impl ScratchOwned {
    pub fn new(words: usize) -> ScratchOwned {
        ScratchOwned {
            data: vec![0; words],
        }
    }

    #[inline(always)]
    pub fn words(&self) -> usize {
        self.data.len()
    }

    pub fn borrow(&mut self) -> Scratch<'_> {
        Scratch {
            data: &mut self.data,
        }
    }
}

/// Borrowed view of a scratch arena. Taking a slice shrinks the view; the
/// slices live as long as the underlying arena borrow.
pub struct Scratch<'a> {
    data: &'a mut [u64],
}

impl<'a> Scratch<'a> {
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.data.len()
    }

    /// Splits a zeroed slice of `len` words off the front.
    pub fn take_slice(&mut self, len: usize) -> &'a mut [u64] {
        let data: &'a mut [u64] = std::mem::take(&mut self.data);
        assert!(
            len <= data.len(),
            "attempted to take {} words from scratch with {} left",
            len,
            data.len()
        );
        let (head, tail) = data.split_at_mut(len);
        self.data = tail;
        head.fill(0);
        head
    }
}

/// Thread-safe buffer recycler behind the no-scratch operation variants.
/// Taking hands out a [`ScratchOwned`] (grown to the requested size);
/// recycling returns it for reuse by any thread.
pub struct GlobalPool {
    free: Mutex<Vec<Vec<u64>>>,
}

impl GlobalPool {
    fn new() -> GlobalPool {
        GlobalPool {
            free: Mutex::new(Vec::new()),
        }
    }

    pub fn take(&self, words: usize) -> ScratchOwned {
        let mut data: Vec<u64> = {
            let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
            free.pop().unwrap_or_default()
        };
        if data.len() < words {
            data.resize(words, 0);
        }
        ScratchOwned { data }
    }

    pub fn recycle(&self, scratch: ScratchOwned) {
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        free.push(scratch.data);
    }
}

/// Process-wide default pool.
pub fn global_pool() -> &'static GlobalPool {
    static POOL: OnceLock<GlobalPool> = OnceLock::new();
    POOL.get_or_init(GlobalPool::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_slice_advances() {
        let mut owned: ScratchOwned = ScratchOwned::new(64);
        let mut scratch: Scratch = owned.borrow();
        let a: &mut [u64] = scratch.take_slice(16);
        let b: &mut [u64] = scratch.take_slice(48);
        assert_eq!(a.len(), 16);
        assert_eq!(b.len(), 48);
        assert_eq!(scratch.available(), 0);
        a[0] = 1;
        b[0] = 2;
        assert_eq!(a[0], 1);
    }

    #[test]
    #[should_panic(expected = "attempted to take")]
    fn test_take_slice_overflow() {
        let mut owned: ScratchOwned = ScratchOwned::new(8);
        let mut scratch: Scratch = owned.borrow();
        let _ = scratch.take_slice(9);
    }

    #[test]
    fn test_global_pool_recycles() {
        let pool: &GlobalPool = global_pool();
        let a: ScratchOwned = pool.take(128);
        assert!(a.words() >= 128);
        pool.recycle(a);
        let b: ScratchOwned = pool.take(32);
        assert!(b.words() >= 32);
        pool.recycle(b);
    }

    #[test]
    fn test_taken_slices_are_zeroed() {
        let mut owned: ScratchOwned = ScratchOwned::new(8);
        {
            let mut scratch: Scratch = owned.borrow();
            scratch.take_slice(8).fill(u64::MAX);
        }
        let mut scratch: Scratch = owned.borrow();
        assert!(scratch.take_slice(8).iter().all(|&x| x == 0));
    }
}
