mod queue_order;
