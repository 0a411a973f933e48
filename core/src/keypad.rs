use std::convert::TryFrom;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use log::debug;

/// One of the 16 hex keys of the CHIP-8 keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Key {
    K0 = 0x0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF,
}

const KEYS: [Key; 16] = [
    Key::K0,
    Key::K1,
    Key::K2,
    Key::K3,
    Key::K4,
    Key::K5,
    Key::K6,
    Key::K7,
    Key::K8,
    Key::K9,
    Key::KA,
    Key::KB,
    Key::KC,
    Key::KD,
    Key::KE,
    Key::KF,
];

impl Key {
    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Key {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        KEYS.get(value as usize).copied().ok_or(value)
    }
}

/// Outcome of a blocking key wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    Pressed(Key),
    /// The wait was cancelled without a key.
    Interrupted,
}

pub trait Keyboard {
    /// Currently held key, without blocking.
    fn pressed_key(&mut self) -> Option<Key>;

    /// Block until a key is pressed.
    fn wait_for_key(&mut self) -> KeyWait;
}

/// Keyboard with nothing attached. Waits are interrupted immediately.
pub struct Disconnected;

impl Keyboard for Disconnected {
    fn pressed_key(&mut self) -> Option<Key> {
        None
    }

    fn wait_for_key(&mut self) -> KeyWait {
        KeyWait::Interrupted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
    /// Cancel a pending (or the next) key wait.
    Interrupt,
}

/// Sending half of a [`ChannelKeyboard`], held by whoever polls the real
/// keyboard.
#[derive(Clone)]
pub struct KeypadHandle {
    tx: Sender<KeyEvent>,
}

impl KeypadHandle {
    /// Returns false once the keyboard has been dropped.
    pub fn send(&self, event: KeyEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn press(&self, key: Key) -> bool {
        self.send(KeyEvent::Down(key))
    }

    pub fn release(&self, key: Key) -> bool {
        self.send(KeyEvent::Up(key))
    }

    pub fn interrupt(&self) -> bool {
        self.send(KeyEvent::Interrupt)
    }
}

/// Keyboard fed with [`KeyEvent`]s over a channel, so the engine thread can
/// block in a key wait while another thread owns the input device.
pub struct ChannelKeyboard {
    rx: Receiver<KeyEvent>,
    held: Vec<Key>,
    interrupt_pending: bool,
}

impl ChannelKeyboard {
    pub fn new() -> (ChannelKeyboard, KeypadHandle) {
        let (tx, rx) = mpsc::channel();
        let keyboard = ChannelKeyboard {
            rx,
            held: Vec::new(),
            interrupt_pending: false,
        };
        (keyboard, KeypadHandle { tx })
    }

    fn apply(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Down(key) => {
                self.held.retain(|k| *k != key);
                self.held.push(key);
            }
            KeyEvent::Up(key) => self.held.retain(|k| *k != key),
            KeyEvent::Interrupt => self.interrupt_pending = true,
        }
    }

    fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }
}

impl Keyboard for ChannelKeyboard {
    fn pressed_key(&mut self) -> Option<Key> {
        self.drain();
        self.held.last().copied()
    }

    fn wait_for_key(&mut self) -> KeyWait {
        // Presses that arrived before the wait started do not count, only
        // interrupts do.
        self.drain();
        loop {
            if self.interrupt_pending {
                self.interrupt_pending = false;
                return KeyWait::Interrupted;
            }
            match self.rx.recv() {
                Ok(KeyEvent::Down(key)) => {
                    self.apply(KeyEvent::Down(key));
                    return KeyWait::Pressed(key);
                }
                Ok(event) => self.apply(event),
                Err(_) => {
                    debug!("keypad handles dropped during key wait");
                    return KeyWait::Interrupted;
                }
            }
        }
    }
}
