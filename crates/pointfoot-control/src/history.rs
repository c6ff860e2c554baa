//! 定长环形历史缓冲区
//!
//! 容量固定，满后写入会淘汰最旧样本；迭代顺序为旧 → 新。

/// 定长环形缓冲区
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    slots: Vec<T>,
    capacity: usize,
    /// 下一次写入位置（满后即最旧样本的位置）
    head: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    /// 创建空缓冲区；`capacity` 为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// 写入一个样本，满时淘汰最旧样本
    pub fn push(&mut self, sample: T) {
        if self.is_full() {
            self.slots[self.head] = sample;
        } else {
            self.slots.push(sample);
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// 预填充规则：未满时先用当前样本填满，然后再正常写入一次
    ///
    /// 首次调用后缓冲区即满，窗口中不会出现零填充。
    pub fn push_with_prefill(&mut self, sample: T) {
        while !self.is_full() {
            self.push(sample.clone());
        }
        self.push(sample);
    }

    /// 旧 → 新迭代
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let split = if self.is_full() { self.head } else { 0 };
        self.slots[split..].iter().chain(self.slots[..split].iter())
    }

    /// 最新样本
    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let index = (self.head + self.capacity - 1) % self.capacity;
        self.slots.get(index)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl<T: Copy> HistoryBuffer<Vec<T>> {
    /// 按旧 → 新顺序展平追加到 `out`
    pub fn extend_flat(&self, out: &mut Vec<T>) {
        for sample in self.iter() {
            out.extend_from_slice(sample);
        }
    }
}
