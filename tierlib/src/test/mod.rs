mod search_structures;
mod workload;
