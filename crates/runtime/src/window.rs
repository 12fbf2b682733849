use rust_decimal::Decimal;
use std::collections::VecDeque;

/// # Summary
/// 固定容量的价格滑动窗口（FIFO）。
///
/// # Invariants
/// - 长度永远不超过容量，新价挤掉最老的价。
/// - 迭代顺序即插入顺序（旧 → 新）。
#[derive(Debug, Clone)]
pub struct PriceWindow {
    data: VecDeque<Decimal>,
    capacity: usize,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// # Summary
    /// 追加最新价，容量溢出时逐出最老的价。
    pub fn push(&mut self, price: Decimal) {
        self.data.push_back(price);
        while self.data.len() > self.capacity {
            self.data.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// 清空窗口数据，容量不变。
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// # Summary
    /// 调整容量。窗口派生状态随配置失效，因此重建为空窗口重新预热。
    pub fn set_capacity(&mut self, capacity: usize) {
        if capacity != self.capacity {
            self.capacity = capacity;
            self.data = VecDeque::with_capacity(capacity);
        }
    }

    pub fn last(&self) -> Option<Decimal> {
        self.data.back().copied()
    }

    /// 按时间顺序（旧 → 新）导出全部价格。
    pub fn to_vec(&self) -> Vec<Decimal> {
        self.data.iter().copied().collect()
    }
}
