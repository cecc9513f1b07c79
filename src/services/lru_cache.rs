use std::collections::VecDeque;

/// Кэш фиксированной ёмкости с вытеснением давно не использованных ключей (LRU).
///
/// Ключи хранятся в порядке от самого свежего (начало) к самому старому (конец).
/// Ёмкость небольшая (единицы-десятки записей), поэтому линейный поиск по
/// `VecDeque` дешевле поддержки отдельного индекса.
///
/// Кэш не потокобезопасен: владелец сериализует доступ своим мьютексом.
#[derive(Debug, Clone)]
pub struct LruCache<K> {
    capacity: usize,
    keys: VecDeque<K>,
}

impl<K: Copy + Eq> LruCache<K> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            keys: VecDeque::with_capacity(capacity),
        }
    }

    /// Вставить ключ как самый свежий.
    ///
    /// Возвращает вытесненный ключ, если вставка нового ключа превысила ёмкость.
    /// Повторная вставка существующего ключа только продвигает его и ничего не вытесняет.
    pub fn put(&mut self, key: K) -> Option<K> {
        if self.promote(key) {
            return None;
        }

        self.keys.push_front(key);
        if self.keys.len() > self.capacity {
            return self.keys.pop_back();
        }
        None
    }

    /// Проверить наличие ключа; найденный ключ становится самым свежим.
    pub fn visit(&mut self, key: K) -> bool {
        self.promote(key)
    }

    pub fn remove(&mut self, key: K) -> bool {
        match self.position(key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ключи от самого свежего к самому старому
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    fn position(&self, key: K) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    fn promote(&mut self, key: K) -> bool {
        match self.position(key) {
            Some(0) => true,
            Some(index) => {
                if let Some(k) = self.keys.remove(index) {
                    self.keys.push_front(k);
                }
                true
            }
            None => false,
        }
    }
}
