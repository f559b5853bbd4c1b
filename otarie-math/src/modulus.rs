pub mod barrett;
pub mod prime;

pub trait WordOps {
    fn log2(self) -> usize;
    fn reverse_bits_msb(self, n: u32) -> Self;
}

macro_rules! impl_word_ops {
    ($t:ty) => {
        impl WordOps for $t {
            #[inline(always)]
            fn log2(self) -> usize {
                (<$t>::BITS - (self - 1).leading_zeros()) as usize
            }

            #[inline(always)]
            fn reverse_bits_msb(self, n: u32) -> Self {
                self.reverse_bits() >> (<$t>::BITS - n)
            }
        }
    };
}

impl_word_ops!(u64);
impl_word_ops!(usize);

pub trait ReduceOnce {
    fn reduce_once(self, q: Self) -> Self;
    fn reduce_once_assign(&mut self, q: Self);
}

impl ReduceOnce for u64 {
    #[inline(always)]
    fn reduce_once(self, q: u64) -> u64 {
        if self >= q {
            self - q
        } else {
            self
        }
    }

    #[inline(always)]
    fn reduce_once_assign(&mut self, q: u64) {
        *self = self.reduce_once(q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_ops() {
        assert_eq!(16u64.log2(), 4);
        assert_eq!(17u64.log2(), 5);
        assert_eq!(0b100usize.reverse_bits_msb(3), 0b001);
        assert_eq!(0b110usize.reverse_bits_msb(3), 0b011);
    }

    #[test]
    fn test_reduce_once() {
        let q: u64 = 97;
        assert_eq!(96u64.reduce_once(q), 96);
        assert_eq!(97u64.reduce_once(q), 0);
        assert_eq!(150u64.reduce_once(q), 53);
    }
}
