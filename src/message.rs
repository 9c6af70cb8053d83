use anyhow::{anyhow, Result};
use std::{
    collections::HashSet,
    fmt::Debug,
    hash::Hash,
    marker::PhantomData,
    num::NonZeroU32,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

pub trait Trigger: Debug + Eq + Hash + Sized + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn as_u32(&self) -> u32;
}

#[macro_export]
macro_rules! trigger_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        $vis enum $name {
            $($variant = $value),*
        }

        impl $crate::message::Trigger for $name {
            const ALL: &'static [Self] = &[
                $(Self::$variant),*
            ];

            fn as_u32(&self) -> u32 {
                match self {
                    $(Self::$variant => $value),*
                }
            }
        }
    };
}

fn trigger_to_nonzero<T: Trigger>(trigger: &T) -> Result<NonZeroU32> {
    NonZeroU32::new(trigger.as_u32())
        .ok_or_else(|| anyhow!("Invalid value for NonZeroU32"))
}

/// Producer side of the event mailbox.
///
/// Raising is a single atomic `fetch_or`, so a notifier can be handed to an
/// interrupt handler or another thread.
///
/// # Type Parameters
/// * `T` - The trigger type implementing the `Trigger` trait.
pub struct Notifier<T: Trigger> {
    bits: Arc<AtomicU32>,
    _marker: PhantomData<T>,
}

impl<T: Trigger> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            bits: Arc::clone(&self.bits),
            _marker: PhantomData,
        }
    }
}

impl<T: Trigger> Notifier<T> {
    /// Raises the given trigger. Raising an already pending trigger is a
    /// no-op.
    ///
    /// # Arguments
    /// * `trigger` - The trigger to raise.
    ///
    /// # Errors
    /// Returns an error if the trigger maps to an empty bit mask.
    pub fn notify(&self, trigger: &T) -> Result<()> {
        let bit = trigger_to_nonzero(trigger)?;
        self.bits.fetch_or(bit.get(), Ordering::AcqRel);

        Ok(())
    }
}

/// Consumer side of the event mailbox.
///
/// # Type Parameters
/// * `T` - The trigger type implementing the `Trigger` trait.
pub struct Dispatcher<T: Trigger> {
    bits: Arc<AtomicU32>,
    _marker: PhantomData<T>,
}

impl<T: Trigger> Dispatcher<T> {
    /// Creates a new `Dispatcher` with nothing pending.
    ///
    /// # Errors
    /// Returns an error if the dispatcher cannot be initialized.
    pub fn new() -> Result<Self> {
        Ok(Self {
            bits: Arc::new(AtomicU32::new(0)),
            _marker: PhantomData,
        })
    }

    /// Returns a `Notifier` feeding this dispatcher.
    ///
    /// # Errors
    /// Returns an error if the notifier cannot be created.
    pub fn notifier(&self) -> Result<Notifier<T>> {
        Ok(Notifier {
            bits: Arc::clone(&self.bits),
            _marker: PhantomData,
        })
    }

    /// Whether any trigger is waiting to be collected.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.bits.load(Ordering::Acquire) != 0
    }

    /// Takes every pending trigger out of the mailbox.
    ///
    /// The mailbox is swapped to empty atomically: anything raised after
    /// this call is kept for the next collection.
    ///
    /// # Returns
    /// A `HashSet` of collected triggers.
    #[must_use]
    pub fn collect(&self) -> HashSet<&'static T> {
        let bits = self.bits.swap(0, Ordering::AcqRel);

        T::ALL
            .iter()
            .filter(|trigger| bits & trigger.as_u32() != 0)
            .collect()
    }
}

/// A continuous boolean signal with one writer and one reader.
///
/// Unlike a trigger it is never cleared; the reader sees whatever the writer
/// stored last.
#[derive(Clone, Debug, Default)]
pub struct Level {
    value: Arc<AtomicBool>,
}

impl Level {
    /// Creates a new `Level` holding `value`.
    #[must_use]
    pub fn new(value: bool) -> Self {
        Self {
            value: Arc::new(AtomicBool::new(value)),
        }
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }
}
